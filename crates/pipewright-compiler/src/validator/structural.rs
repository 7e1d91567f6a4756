//! Structural checks: names, job dependencies and step lists

use crate::codegen::transform::{iteration_count, iteration_name};
use crate::graph::Digraph;
use crate::options::CompilerOptions;
use crate::semantic::suggest::{did_you_mean, suggest};
use crate::validator::{ValidationContext, Validator};
use pipewright_core::ast::{CycleNode, JobKind, StepNode, WorkflowNode};
use pipewright_core::{Diagnostic, DiagnosticCode, Span};
use std::collections::{BTreeSet, HashMap};

/// Checks workflow shape that the front end does not enforce
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

/// A job or cycle, seen through the fields both share
struct Unit<'a> {
    name: &'a str,
    span: &'a Span,
    needs: &'a [String],
}

fn units(workflow: &WorkflowNode) -> Vec<Unit<'_>> {
    let jobs = workflow.jobs.iter().map(|j| Unit {
        name: &j.name,
        span: &j.span,
        needs: &j.needs,
    });
    let cycles = workflow.cycles.iter().map(|c| Unit {
        name: &c.name,
        span: &c.span,
        needs: &c.needs,
    });
    jobs.chain(cycles).collect()
}

impl StructuralValidator {
    pub fn check(&self, workflow: &WorkflowNode, options: &CompilerOptions) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if workflow.name.trim().is_empty() {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::EMPTY_NAME,
                "workflow name cannot be empty",
                workflow.span.clone(),
            ));
        }

        let units = units(workflow);
        self.check_names(&units, &mut diagnostics);
        self.check_iteration_names(&units, &workflow.cycles, options.max_cycle_iterations, &mut diagnostics);
        self.check_needs(&units, options.max_suggestion_distance, &mut diagnostics);
        self.check_dependency_cycles(&units, &mut diagnostics);

        for job in &workflow.jobs {
            match &job.kind {
                JobKind::Plain { steps } | JobKind::Matrix { steps, .. } => {
                    if steps.is_empty() {
                        diagnostics.push(Diagnostic::error(
                            DiagnosticCode::EMPTY_STEPS,
                            format!("{} '{}' has no steps", job.kind_name(), job.name),
                            job.span.clone(),
                        ));
                    }
                    check_steps(steps, &mut diagnostics);
                }
                JobKind::Agent { .. } => {}
            }
        }
        for cycle in &workflow.cycles {
            if cycle.steps.is_empty() {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::EMPTY_STEPS,
                    format!("cycle '{}' has no steps", cycle.name),
                    cycle.span.clone(),
                ));
            }
            check_steps(&cycle.steps, &mut diagnostics);
        }

        diagnostics
    }

    fn check_names(&self, units: &[Unit<'_>], diagnostics: &mut Vec<Diagnostic>) {
        let mut seen: HashMap<&str, &Span> = HashMap::new();
        for unit in units {
            if unit.name.trim().is_empty() {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::EMPTY_NAME,
                    "job name cannot be empty",
                    unit.span.clone(),
                ));
                continue;
            }
            if let Some(first) = seen.get(unit.name) {
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::DUPLICATE_JOB,
                        format!("job '{}' is declared more than once", unit.name),
                        unit.span.clone(),
                    )
                    .with_hint(format!("first declared at {}", first)),
                );
            } else {
                seen.insert(unit.name, unit.span);
            }
        }
    }

    /// Unrolled cycle iterations take the names `<cycle>-1` to `<cycle>-N`
    fn check_iteration_names(
        &self,
        units: &[Unit<'_>],
        cycles: &[CycleNode],
        max_cycle_iterations: u32,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for cycle in cycles {
            let count = iteration_count(cycle, max_cycle_iterations);
            let prefix = format!("{}-", cycle.name);
            for unit in units {
                let Some(suffix) = unit.name.strip_prefix(prefix.as_str()) else {
                    continue;
                };
                let Ok(iteration) = suffix.parse::<u32>() else {
                    continue;
                };
                if iteration < 1 || iteration > count || iteration_name(&cycle.name, iteration) != unit.name {
                    continue;
                }
                diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::DUPLICATE_JOB,
                        format!(
                            "job '{}' collides with iteration {} of cycle '{}'",
                            unit.name, iteration, cycle.name
                        ),
                        unit.span.clone(),
                    )
                    .with_hint(format!(
                        "cycle '{}' unrolls into jobs '{}' to '{}'; rename one of them",
                        cycle.name,
                        iteration_name(&cycle.name, 1),
                        iteration_name(&cycle.name, count)
                    )),
                );
            }
        }
    }

    fn check_needs(&self, units: &[Unit<'_>], max_distance: usize, diagnostics: &mut Vec<Diagnostic>) {
        let known: Vec<&str> = units.iter().map(|u| u.name).collect();
        for unit in units {
            for need in unit.needs {
                if !known.contains(&need.as_str()) {
                    let hint = did_you_mean(suggest(need, known.iter().copied(), max_distance));
                    diagnostics.push(
                        Diagnostic::error(
                            DiagnosticCode::UNKNOWN_NEEDS,
                            format!("job '{}' needs unknown job '{}'", unit.name, need),
                            unit.span.clone(),
                        )
                        .with_optional_hint(hint),
                    );
                }
            }
        }
    }

    fn check_dependency_cycles(&self, units: &[Unit<'_>], diagnostics: &mut Vec<Diagnostic>) {
        let mut graph: Digraph<&str> = Digraph::new();
        for unit in units {
            graph.add_node(unit.name);
            for need in unit.needs {
                if units.iter().any(|u| u.name == need.as_str()) {
                    graph.add_edge(unit.name, need.as_str());
                }
            }
        }

        let cyclic = graph.cyclic_nodes();
        let mut reported: BTreeSet<&str> = BTreeSet::new();
        for unit in units {
            if !cyclic.contains(unit.name) || reported.contains(unit.name) {
                continue;
            }
            if let Some(cycle) = graph.cycle_through(&unit.name) {
                reported.extend(cycle.iter().copied());
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::JOB_DEPENDENCY_CYCLE,
                    format!("job dependency cycle: {}", cycle.join(" -> ")),
                    unit.span.clone(),
                ));
            }
        }
    }
}

fn check_steps(steps: &[StepNode], diagnostics: &mut Vec<Diagnostic>) {
    for step in steps {
        match step {
            StepNode::Uses(uses) if uses.action.trim().is_empty() => {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::EMPTY_NAME,
                    "action reference cannot be empty",
                    uses.span.clone(),
                ));
            }
            StepNode::Guard(guard) => {
                if guard.steps.is_empty() {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticCode::EMPTY_GUARD,
                        format!("guard '{}' contains no steps", guard.condition),
                        guard.span.clone(),
                    ));
                }
                check_steps(&guard.steps, diagnostics);
            }
            StepNode::Uses(_) | StepNode::Shell(_) | StepNode::AgentTask(_) => {}
        }
    }
}

impl Validator for StructuralValidator {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        match &ctx.file.workflow {
            Some(workflow) => self.check(workflow, ctx.options),
            None => Vec::new(),
        }
    }
}
