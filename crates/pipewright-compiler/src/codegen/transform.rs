//! AST to IR transform
//!
//! Maps each job variant to a [`JobIR`]. Matrix strategies are carried
//! through unexpanded. Guard blocks are flattened into conditional steps,
//! agent work becomes a step running the configured agent action, and
//! bounded cycles are unrolled into a chain of sequential jobs.

use crate::codegen::condition::ConditionCompiler;
use crate::codegen::json_schema::to_json_schema;
use crate::codegen::shell::normalize_script;
use crate::options::CompilerOptions;
use crate::semantic::type_registry::{FileSnapshot, ResolvedType};
use indexmap::IndexSet;
use pipewright_core::ast::{
    AgentTask, CycleNode, Expression, JobKind, JobNode, StepNode, WorkflowNode,
};
use pipewright_core::ir::{JobIR, MatrixIR, StepAction, StepIR, StrategyIR, WorkflowIR};

/// A flattened step and the source step it came from
struct FlatStep<'a> {
    ir: StepIR,
    source: &'a StepNode,
}

/// Transforms a workflow AST into IR
pub struct IrTransform<'a> {
    options: &'a CompilerOptions,
    types: &'a FileSnapshot,
}

impl<'a> IrTransform<'a> {
    pub fn new(options: &'a CompilerOptions, types: &'a FileSnapshot) -> Self {
        Self { options, types }
    }

    pub fn transform(&self, workflow: &WorkflowNode) -> WorkflowIR {
        let mut ir = WorkflowIR::new(workflow.name.clone());
        if let Some(trigger) = &workflow.trigger {
            ir.trigger = trigger.events.clone();
        }

        for job in &workflow.jobs {
            ir.jobs.insert(job.name.clone(), self.transform_job(job, workflow));
        }
        for cycle in &workflow.cycles {
            for (name, job) in self.unroll_cycle(cycle, workflow) {
                ir.jobs.insert(name, job);
            }
        }
        ir
    }

    fn transform_job(&self, job: &JobNode, workflow: &WorkflowNode) -> JobIR {
        let mut ir = JobIR {
            target: job.target.clone(),
            needs: self.map_needs(&job.needs, workflow),
            condition: self.gate_condition(&job.needs, job.condition.as_ref(), workflow),
            ..JobIR::default()
        };

        let flat = match &job.kind {
            JobKind::Plain { steps } => self.flatten(steps),
            JobKind::Matrix { steps, matrix } => {
                ir.strategy = Some(StrategyIR {
                    matrix: MatrixIR {
                        axes: matrix.axes.clone(),
                        include: matrix.include.clone(),
                        exclude: matrix.exclude.clone(),
                    },
                    max_parallel: matrix.max_parallel,
                    fail_fast: matrix.fail_fast,
                });
                self.flatten(steps)
            }
            JobKind::Agent { task } => {
                ir.steps.push(self.agent_step(task));
                Vec::new()
            }
        };

        let output_names: Vec<&str> = job.outputs.iter().map(|o| o.name.as_str()).collect();
        if matches!(job.kind, JobKind::Agent { .. }) {
            self.wire_agent_outputs(&mut ir, &output_names);
        } else {
            self.finish_steps(&mut ir, flat, &output_names);
        }
        ir
    }

    /// `needs` entries naming a cycle point at its last iteration
    fn map_needs(&self, needs: &[String], workflow: &WorkflowNode) -> Vec<String> {
        needs
            .iter()
            .map(|need| match workflow.cycles.iter().find(|c| &c.name == need) {
                Some(cycle) => iteration_name(&cycle.name, self.iterations(cycle)),
                None => need.clone(),
            })
            .collect()
    }

    fn iterations(&self, cycle: &CycleNode) -> u32 {
        iteration_count(cycle, self.options.max_cycle_iterations)
    }

    /// Job condition, gated when the job needs a cycle
    ///
    /// A cycle that stops early leaves its remaining iterations skipped, so
    /// the last iteration is accepted when it succeeded or was skipped.
    /// Other needs must still have succeeded.
    fn gate_condition(
        &self,
        needs: &[String],
        condition: Option<&Expression>,
        workflow: &WorkflowNode,
    ) -> Option<String> {
        let own = condition.map(|expr| {
            let expr = workflow.cycles.iter().fold(expr.clone(), |expr, cycle| {
                let last = iteration_name(&cycle.name, self.iterations(cycle));
                rename_needs(&expr, &cycle.name, &last)
            });
            ConditionCompiler::compile(&expr)
        });

        let is_cycle = |need: &String| workflow.cycles.iter().any(|c| &c.name == need);
        if !needs.iter().any(is_cycle) {
            return own;
        }
        let mut clauses = vec!["!cancelled()".to_string(), "!failure()".to_string()];
        clauses.extend(
            needs
                .iter()
                .filter(|need| !is_cycle(*need))
                .map(|need| format!("needs.{}.result == 'success'", need)),
        );
        if let Some(own) = own {
            clauses.push(format!("({})", own));
        }
        Some(clauses.join(" && "))
    }

    fn unroll_cycle(&self, cycle: &CycleNode, workflow: &WorkflowNode) -> Vec<(String, JobIR)> {
        let count = self.iterations(cycle);
        let outputs = until_outputs(cycle);
        let output_names: Vec<&str> = outputs.iter().map(String::as_str).collect();

        (1..=count)
            .map(|i| {
                let mut ir = JobIR {
                    target: cycle.target.clone(),
                    ..JobIR::default()
                };
                if i == 1 {
                    ir.needs = self.map_needs(&cycle.needs, workflow);
                    ir.condition = self.gate_condition(&cycle.needs, None, workflow);
                } else {
                    let previous = iteration_name(&cycle.name, i - 1);
                    if let Some(until) = &cycle.until {
                        let until = rename_needs(until, &cycle.name, &previous);
                        ir.condition = Some(format!("!({})", ConditionCompiler::compile(&until)));
                    }
                    ir.needs = vec![previous];
                }
                self.finish_steps(&mut ir, self.flatten(&cycle.steps), &output_names);
                (iteration_name(&cycle.name, i), ir)
            })
            .collect()
    }

    /// Flatten guard blocks, in source order
    fn flatten<'s>(&self, steps: &'s [StepNode]) -> Vec<FlatStep<'s>> {
        let mut flat = Vec::new();
        self.flatten_into(steps, None, &mut flat);
        flat
    }

    fn flatten_into<'s>(
        &self,
        steps: &'s [StepNode],
        guard: Option<&str>,
        flat: &mut Vec<FlatStep<'s>>,
    ) {
        for step in steps {
            let mut ir = match step {
                StepNode::Shell(shell) => {
                    let mut ir = StepIR::new(StepAction::Run {
                        script: normalize_script(&shell.run),
                    });
                    ir.name = shell.name.clone();
                    ir
                }
                StepNode::Uses(uses) => {
                    let mut ir = StepIR::new(StepAction::Uses {
                        action: uses.action.clone(),
                        with: uses.with.clone(),
                    });
                    ir.name = uses.name.clone();
                    ir
                }
                StepNode::AgentTask(agent) => {
                    let mut ir = self.agent_step(&agent.task);
                    ir.name = agent.name.clone();
                    ir
                }
                StepNode::Guard(nested) => {
                    let combined = match guard {
                        Some(outer) => format!("({}) && ({})", outer, nested.condition.trim()),
                        None => nested.condition.trim().to_string(),
                    };
                    self.flatten_into(&nested.steps, Some(&combined), flat);
                    continue;
                }
            };
            ir.condition = guard.map(str::to_string);
            flat.push(FlatStep { ir, source: step });
        }
    }

    fn agent_step(&self, task: &AgentTask) -> StepIR {
        let output_schema = match &task.output {
            Some(schema) => {
                let linked = self.types.link(schema);
                to_json_schema(&linked, self.types).to_string()
            }
            None => "{}".to_string(),
        };
        StepIR::new(StepAction::agent(
            self.options.agent_action.clone(),
            task.prompt.clone().unwrap_or_default(),
            output_schema,
        ))
    }

    /// Assign step ids and wire outputs when the job declares any
    fn finish_steps(&self, ir: &mut JobIR, flat: Vec<FlatStep<'_>>, outputs: &[&str]) {
        if !outputs.is_empty() && !flat.is_empty() {
            for name in outputs {
                let writer = flat
                    .iter()
                    .rposition(|step| self.writes_output(step.source, name))
                    .unwrap_or(flat.len() - 1);
                ir.outputs.insert(name.to_string(), output_reference(writer, name));
            }
        }

        let with_ids = !ir.outputs.is_empty();
        ir.steps = flat
            .into_iter()
            .enumerate()
            .map(|(i, step)| {
                let mut step_ir = step.ir;
                if with_ids {
                    step_ir.id = Some(step_id(i));
                }
                step_ir
            })
            .collect();
    }

    fn wire_agent_outputs(&self, ir: &mut JobIR, outputs: &[&str]) {
        if outputs.is_empty() {
            return;
        }
        for name in outputs {
            ir.outputs.insert(name.to_string(), output_reference(0, name));
        }
        for (i, step) in ir.steps.iter_mut().enumerate() {
            step.id = Some(step_id(i));
        }
    }

    /// Whether a step writes the named output
    fn writes_output(&self, step: &StepNode, name: &str) -> bool {
        match step {
            StepNode::Shell(shell) => shell
                .run
                .lines()
                .any(|line| line.contains("GITHUB_OUTPUT") && assigns(line, name)),
            StepNode::AgentTask(agent) => match &agent.task.output {
                Some(schema) => {
                    let linked = self.types.link(schema);
                    matches!(self.types.expand(&linked), ResolvedType::Object(fields) if fields.contains_key(name))
                }
                None => false,
            },
            StepNode::Uses(_) | StepNode::Guard(_) => false,
        }
    }
}

/// `step_<index>`
pub fn step_id(index: usize) -> String {
    format!("step_{}", index)
}

/// `<cycle>-<iteration>`
pub fn iteration_name(cycle: &str, iteration: u32) -> String {
    format!("{}-{}", cycle, iteration)
}

/// Number of jobs a cycle unrolls into, at least one
pub fn iteration_count(cycle: &CycleNode, max_cycle_iterations: u32) -> u32 {
    cycle
        .max_iterations
        .unwrap_or(max_cycle_iterations)
        .min(max_cycle_iterations)
        .max(1)
}

/// `<name>=` appears on the line as a whole word
fn assigns(line: &str, name: &str) -> bool {
    let assignment = format!("{}=", name);
    line.match_indices(assignment.as_str()).any(|(at, _)| {
        line[..at]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '-'))
    })
}

fn output_reference(step: usize, name: &str) -> String {
    format!("${{{{ steps.{}.outputs.{} }}}}", step_id(step), name)
}

/// Output names a cycle's stop predicate reads from the cycle itself
fn until_outputs(cycle: &CycleNode) -> Vec<String> {
    let mut names: IndexSet<String> = IndexSet::new();
    if let Some(until) = &cycle.until {
        until.for_each_path(&mut |segments| {
            if let [root, job, outputs, name, ..] = segments {
                if (root == "needs" || root == "jobs") && job == &cycle.name && outputs == "outputs" {
                    names.insert(name.clone());
                }
            }
        });
    }
    names.into_iter().collect()
}

/// Point `needs.<cycle>` (or `jobs.<cycle>`) paths at a concrete iteration
fn rename_needs(expr: &Expression, cycle: &str, iteration: &str) -> Expression {
    match expr {
        Expression::Path { segments } => {
            let mut segments = segments.clone();
            if segments.len() > 1
                && (segments[0] == "needs" || segments[0] == "jobs")
                && segments[1] == cycle
            {
                segments[1] = iteration.to_string();
            }
            Expression::Path { segments }
        }
        Expression::Binary { left, op, right } => Expression::binary(
            rename_needs(left, cycle, iteration),
            *op,
            rename_needs(right, cycle, iteration),
        ),
        Expression::Unary { op, operand } => {
            Expression::unary(*op, rename_needs(operand, cycle, iteration))
        }
        Expression::Call { name, args } => Expression::call(
            name.clone(),
            args.iter().map(|a| rename_needs(a, cycle, iteration)).collect(),
        ),
        Expression::Literal { .. } | Expression::Null => expr.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewright_core::ast::{BinaryOperator, MatrixSpec, SchemaTypeNode};
    use pipewright_core::Scalar;

    fn transform(workflow: &WorkflowNode) -> WorkflowIR {
        let options = CompilerOptions::default();
        let types = FileSnapshot::empty("a.flow");
        IrTransform::new(&options, &types).transform(workflow)
    }

    #[test]
    fn test_output_wired_to_last_step() {
        let wf = WorkflowNode::new("CI").with_job(
            JobNode::plain(
                "build",
                Some("ubuntu-latest"),
                vec![StepNode::shell("make"), StepNode::shell("make test")],
            )
            .with_output("report", SchemaTypeNode::primitive("json")),
        );
        let ir = transform(&wf);
        let job = &ir.jobs["build"];

        let ids: Vec<_> = job.steps.iter().map(|s| s.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["step_0", "step_1"]);
        assert_eq!(job.outputs["report"], "${{ steps.step_1.outputs.report }}");
    }

    #[test]
    fn test_output_wired_to_writing_step() {
        let wf = WorkflowNode::new("CI").with_job(
            JobNode::plain(
                "build",
                Some("ubuntu-latest"),
                vec![
                    StepNode::shell("echo \"version=1.2\" >> \"$GITHUB_OUTPUT\""),
                    StepNode::shell("make"),
                ],
            )
            .with_output("version", SchemaTypeNode::primitive("string")),
        );
        assert_eq!(
            transform(&wf).jobs["build"].outputs["version"],
            "${{ steps.step_0.outputs.version }}"
        );
    }

    #[test]
    fn test_no_ids_without_outputs() {
        let wf = WorkflowNode::new("CI").with_job(JobNode::plain(
            "build",
            Some("ubuntu-latest"),
            vec![StepNode::shell("make")],
        ));
        assert_eq!(transform(&wf).jobs["build"].steps[0].id, None);
    }

    #[test]
    fn test_guards_flatten_with_combined_conditions() {
        let wf = WorkflowNode::new("CI").with_job(JobNode::plain(
            "build",
            Some("ubuntu-latest"),
            vec![
                StepNode::shell("make"),
                StepNode::guard(
                    "github.event_name == 'push'",
                    vec![
                        StepNode::shell("make publish"),
                        StepNode::guard("runner.os == 'Linux'", vec![StepNode::shell("make deb")]),
                    ],
                ),
            ],
        ));
        let ir = transform(&wf);
        let conditions: Vec<Option<&str>> = ir.jobs["build"]
            .steps
            .iter()
            .map(|s| s.condition.as_deref())
            .collect();
        assert_eq!(
            conditions,
            vec![
                None,
                Some("github.event_name == 'push'"),
                Some("(github.event_name == 'push') && (runner.os == 'Linux')"),
            ]
        );
    }

    #[test]
    fn test_matrix_strategy_passes_through() {
        let mut spec = MatrixSpec::from_axes([("os", vec![Scalar::from("linux"), Scalar::from("macos")])]);
        spec.max_parallel = Some(2);
        spec.exclude.push([("os".to_string(), Scalar::from("macos"))].into_iter().collect());
        let wf = WorkflowNode::new("CI").with_job(JobNode::matrix(
            "build",
            Some("${{ matrix.os }}"),
            spec.clone(),
            vec![StepNode::shell("make")],
        ));
        let strategy = transform(&wf).jobs["build"].strategy.clone().unwrap();
        assert_eq!(strategy.matrix.axes, spec.axes);
        assert_eq!(strategy.matrix.exclude, spec.exclude);
        assert_eq!(strategy.max_parallel, Some(2));
    }

    #[test]
    fn test_cycle_unrolls_into_chain() {
        let until = Expression::binary(
            Expression::path("needs.retry.outputs.done"),
            BinaryOperator::Eq,
            Expression::literal("true"),
        );
        let wf = WorkflowNode::new("CI")
            .with_job(
                JobNode::plain("report", Some("ubuntu-latest"), vec![StepNode::shell("make")])
                    .with_needs(&["retry"]),
            )
            .with_cycle(
                CycleNode::new(
                    "retry",
                    Some("ubuntu-latest"),
                    vec![StepNode::shell("echo \"done=true\" >> $GITHUB_OUTPUT")],
                )
                .until(until)
                .max_iterations(3),
            );
        let ir = transform(&wf);

        let names: Vec<&str> = ir.jobs.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["report", "retry-1", "retry-2", "retry-3"]);
        assert_eq!(ir.jobs["report"].needs, vec!["retry-3"]);
        assert_eq!(ir.jobs["retry-1"].condition, None);
        assert_eq!(ir.jobs["retry-3"].needs, vec!["retry-2"]);
        assert_eq!(
            ir.jobs["retry-3"].condition.as_deref(),
            Some("!(needs.retry-2.outputs.done == 'true')")
        );
        assert_eq!(ir.jobs["retry-2"].outputs["done"], "${{ steps.step_0.outputs.done }}");
        assert_eq!(ir.jobs["report"].condition.as_deref(), Some("!cancelled() && !failure()"));
    }

    fn retry_until_done() -> CycleNode {
        CycleNode::new(
            "retry",
            Some("ubuntu-latest"),
            vec![StepNode::shell("echo \"done=true\" >> $GITHUB_OUTPUT")],
        )
        .until(Expression::binary(
            Expression::path("needs.retry.outputs.done"),
            BinaryOperator::Eq,
            Expression::literal("true"),
        ))
        .max_iterations(3)
    }

    #[test]
    fn test_early_stop_keeps_dependents_running() {
        let wf = WorkflowNode::new("CI")
            .with_job(JobNode::plain("build", Some("ubuntu-latest"), vec![StepNode::shell("make")]))
            .with_job(
                JobNode::plain("report", Some("ubuntu-latest"), vec![StepNode::shell("make report")])
                    .with_needs(&["build", "retry"])
                    .with_condition(Expression::binary(
                        Expression::path("needs.retry.outputs.done"),
                        BinaryOperator::Ne,
                        Expression::literal("false"),
                    )),
            )
            .with_cycle(retry_until_done());
        let ir = transform(&wf);

        let report = &ir.jobs["report"];
        assert_eq!(report.needs, vec!["build", "retry-3"]);
        assert_eq!(
            report.condition.as_deref(),
            Some(
                "!cancelled() && !failure() && needs.build.result == 'success' \
                 && (needs.retry-3.outputs.done != 'false')"
            )
        );
        // A stopped chain skips later iterations through their needs
        assert_eq!(
            ir.jobs["retry-2"].condition.as_deref(),
            Some("!(needs.retry-1.outputs.done == 'true')")
        );
    }

    #[test]
    fn test_cycle_after_cycle_is_gated() {
        let wf = WorkflowNode::new("CI")
            .with_cycle(retry_until_done())
            .with_cycle(
                CycleNode::new("verify", Some("ubuntu-latest"), vec![StepNode::shell("./verify")])
                    .with_needs(&["retry"])
                    .max_iterations(2),
            );
        let ir = transform(&wf);
        assert_eq!(ir.jobs["verify-1"].needs, vec!["retry-3"]);
        assert_eq!(ir.jobs["verify-1"].condition.as_deref(), Some("!cancelled() && !failure()"));
        assert_eq!(ir.jobs["verify-2"].condition, None);
    }

    #[test]
    fn test_plain_needs_keep_default_condition() {
        let wf = WorkflowNode::new("CI")
            .with_job(JobNode::plain("build", Some("ubuntu-latest"), vec![StepNode::shell("make")]))
            .with_job(
                JobNode::plain("test", Some("ubuntu-latest"), vec![StepNode::shell("make test")])
                    .with_needs(&["build"]),
            );
        assert_eq!(transform(&wf).jobs["test"].condition, None);
    }

    #[test]
    fn test_output_assignment_matches_whole_name() {
        let wf = WorkflowNode::new("CI").with_job(
            JobNode::plain(
                "build",
                Some("ubuntu-latest"),
                vec![
                    StepNode::shell("echo \"report=a\" >> \"$GITHUB_OUTPUT\""),
                    StepNode::shell("echo \"myreport=b\" >> \"$GITHUB_OUTPUT\""),
                    StepNode::shell("make"),
                ],
            )
            .with_output("report", SchemaTypeNode::primitive("string")),
        );
        assert_eq!(
            transform(&wf).jobs["build"].outputs["report"],
            "${{ steps.step_0.outputs.report }}"
        );
    }

    #[test]
    fn test_assigns() {
        assert!(assigns("echo report=1 >> $GITHUB_OUTPUT", "report"));
        assert!(assigns("report=1", "report"));
        assert!(assigns("echo \"myreport=1\"; echo \"report=2\"", "report"));
        assert!(!assigns("echo my_report=1", "report"));
        assert!(!assigns("echo pre-report=1", "report"));
        assert!(!assigns("echo myreport=1", "report"));
    }

    #[test]
    fn test_iteration_count_bounds() {
        let cycle = CycleNode::new("retry", None, vec![StepNode::shell("./try")]);
        assert_eq!(iteration_count(&cycle, 256), 256);
        assert_eq!(iteration_count(&cycle.clone().max_iterations(3), 256), 3);
        assert_eq!(iteration_count(&cycle.clone().max_iterations(500), 256), 256);
        assert_eq!(iteration_count(&cycle.max_iterations(0), 256), 1);
    }

    #[test]
    fn test_agent_job_runs_agent_action() {
        let wf = WorkflowNode::new("CI").with_job(
            JobNode::agent(
                "review",
                Some("ubuntu-latest"),
                AgentTask::new("Review the diff", SchemaTypeNode::primitive("bool")),
            )
            .with_output("approved", SchemaTypeNode::primitive("bool")),
        );
        let job = &transform(&wf).jobs["review"];
        match &job.steps[0].action {
            StepAction::Agent { action, with } => {
                assert_eq!(action, "pipewright/agent-task@v1");
                assert_eq!(with.prompt, "Review the diff");
                assert_eq!(with.output_schema, r#"{"type":"boolean"}"#);
            }
            other => panic!("Expected agent step, got {:?}", other),
        }
        assert_eq!(job.outputs["approved"], "${{ steps.step_0.outputs.approved }}");
    }
}
