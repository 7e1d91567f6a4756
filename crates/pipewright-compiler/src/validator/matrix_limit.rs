//! Combinatorial job-count limits of matrix jobs

use crate::matrix::MatrixExpander;
use crate::options::MATRIX_JOB_LIMIT;
use crate::validator::{ValidationContext, Validator};
use pipewright_core::ast::{JobNode, WorkflowNode};
use pipewright_core::{Diagnostic, DiagnosticCode};

#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixLimitValidator;

impl MatrixLimitValidator {
    pub fn check(&self, workflow: &WorkflowNode, warning_threshold: u64) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for job in &workflow.jobs {
            self.check_job(job, warning_threshold, &mut diagnostics);
        }
        diagnostics
    }

    fn check_job(&self, job: &JobNode, warning_threshold: u64, diagnostics: &mut Vec<Diagnostic>) {
        let Some(spec) = job.matrix_spec() else {
            return;
        };

        for (axis, values) in &spec.axes {
            if values.is_empty() {
                diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::MATRIX_EMPTY_AXIS,
                    format!("matrix axis '{}' of job '{}' has no values", axis, job.name),
                    job.span.clone(),
                ));
            }
        }

        if spec.max_parallel == Some(0) {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::MATRIX_ZERO_PARALLEL,
                format!("job '{}' sets max-parallel to 0, so no job can run", job.name),
                job.span.clone(),
            ));
        }

        let count = MatrixExpander::count(spec);
        let limit = u128::from(MATRIX_JOB_LIMIT);
        if count.total > limit {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::MATRIX_OVER_LIMIT,
                    format!(
                        "matrix job '{}' expands to {} jobs ({}), over the platform limit of {}",
                        job.name,
                        count.total,
                        count.product(),
                        MATRIX_JOB_LIMIT
                    ),
                    job.span.clone(),
                )
                .with_hint(count.to_string()),
            );
        } else if count.total > u128::from(warning_threshold) {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCode::MATRIX_OVER_THRESHOLD,
                    format!(
                        "matrix job '{}' expands to {} jobs ({}), above the warning threshold of {}",
                        job.name,
                        count.total,
                        count.product(),
                        warning_threshold
                    ),
                    job.span.clone(),
                )
                .with_hint(count.to_string()),
            );
        }
    }
}

impl Validator for MatrixLimitValidator {
    fn name(&self) -> &'static str {
        "matrix-limit"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        match &ctx.file.workflow {
            Some(workflow) => self.check(workflow, ctx.options.matrix_warning_threshold),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewright_core::ast::{MatrixSpec, StepNode};
    use pipewright_core::Scalar;

    fn matrix_job(lengths: &[usize]) -> WorkflowNode {
        let axes = lengths.iter().enumerate().map(|(i, n)| {
            (
                format!("axis{}", i),
                (0..*n as i64).map(Scalar::Int).collect::<Vec<_>>(),
            )
        });
        WorkflowNode::new("CI").with_job(JobNode::matrix(
            "build",
            Some("ubuntu-latest"),
            MatrixSpec::from_axes(axes),
            vec![StepNode::shell("make")],
        ))
    }

    #[test]
    fn test_message_shows_arithmetic() {
        let diags = MatrixLimitValidator.check(&matrix_job(&[17, 16]), 200);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message().contains("axis0=17 × axis1=16 = 272"));
        assert_eq!(diags[0].hint(), Some("axis0=17 × axis1=16 = 272, +0 include, -0 exclude = 272"));
    }

    #[test]
    fn test_empty_axis_and_zero_parallel() {
        let mut wf = matrix_job(&[3, 0]);
        if let pipewright_core::ast::JobKind::Matrix { matrix, .. } = &mut wf.jobs[0].kind {
            matrix.max_parallel = Some(0);
        }
        let codes: Vec<u16> = MatrixLimitValidator
            .check(&wf, 200)
            .iter()
            .map(|d| d.code().0)
            .collect();
        assert_eq!(codes, vec![7003, 7004]);
    }

    #[test]
    fn test_plain_jobs_are_ignored() {
        let wf = WorkflowNode::new("CI").with_job(JobNode::plain(
            "build",
            Some("ubuntu-latest"),
            vec![StepNode::shell("make")],
        ));
        assert!(MatrixLimitValidator.check(&wf, 200).is_empty());
    }
}
