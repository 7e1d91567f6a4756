//! Compiler tests over single files
//!
//! Diagnostics surfaced through the full pipeline, result shape and
//! determinism.

mod common;

use common::*;
use pipewright_compiler::{CompileResult, Compiler, CompilerOptions};
use pipewright_core::ast::*;
use pipewright_core::{DiagnosticCode, Scalar, Severity, Span};

fn compile(file: SourceFile) -> CompileResult {
    Compiler::new().compile(file).unwrap()
}

fn axis(len: i64) -> Vec<Scalar> {
    (0..len).map(Scalar::Int).collect()
}

// =============================================================================
// Required fields and spans
// =============================================================================

#[test]
fn test_missing_target_points_at_job() {
    let span = Span::new("ci.flow", 4, 3, 9, 1);
    let file = SourceFile::new("ci.flow").with_workflow(
        WorkflowNode::new("CI").with_job(
            JobNode::plain("build", None, vec![StepNode::shell("make")]).with_span(span.clone()),
        ),
    );

    let result = compile(file);

    let diagnostic = expect_code(&result, DiagnosticCode::MISSING_TARGET);
    assert_eq!(diagnostic.severity(), Severity::Error);
    assert_eq!(diagnostic.span(), &span);
    assert!(!result.success);
    // Generation still runs so every problem shows in one pass
    assert!(result.text.is_some());
}

#[test]
fn test_agent_job_requires_prompt_and_schema() {
    let file = SourceFile::new("ci.flow").with_workflow(WorkflowNode::new("CI").with_job(
        JobNode::agent("review", Some("ubuntu-latest"), AgentTask::default()),
    ));
    let result = compile(file);
    expect_code(&result, DiagnosticCode::MISSING_PROMPT);
    expect_code(&result, DiagnosticCode::MISSING_OUTPUT_SCHEMA);
}

// =============================================================================
// Types
// =============================================================================

#[test]
fn test_types_only_file_has_no_text() {
    let file = SourceFile::new("types.flow").with_type(
        "Report",
        SchemaTypeNode::object([("score", SchemaTypeNode::primitive("strng"))]),
    );

    let result = compile(file);

    assert!(result.text.is_none());
    let diagnostic = expect_code(&result, DiagnosticCode::UNKNOWN_PRIMITIVE);
    assert_eq!(diagnostic.hint(), Some("did you mean 'string'?"));
}

#[test]
fn test_unknown_type_suggests_nearest() {
    let file = SourceFile::new("ci.flow")
        .with_type(
            "Report",
            SchemaTypeNode::object([("score", SchemaTypeNode::primitive("int"))]),
        )
        .with_workflow(WorkflowNode::new("CI").with_job(
            JobNode::plain("build", Some("ubuntu-latest"), vec![StepNode::shell("make")])
                .with_output("report", SchemaTypeNode::reference("Reprt")),
        ));

    let result = compile(file);

    let diagnostic = expect_code(&result, DiagnosticCode::UNDEFINED_TYPE);
    assert!(diagnostic.hint().unwrap_or_default().contains("Report"));
}

#[test]
fn test_unknown_property_suggests_field() {
    let file = SourceFile::new("ci.flow")
        .with_type(
            "Report",
            SchemaTypeNode::object([("score", SchemaTypeNode::primitive("int"))]),
        )
        .with_workflow(
            WorkflowNode::new("CI")
                .with_job(
                    JobNode::plain("build", Some("ubuntu-latest"), vec![StepNode::shell("make")])
                        .with_output("report", SchemaTypeNode::reference("Report")),
                )
                .with_job(
                    JobNode::plain("gate", Some("ubuntu-latest"), vec![StepNode::shell("make")])
                        .with_needs(&["build"])
                        .with_condition(Expression::binary(
                            Expression::path("needs.build.outputs.report.scor"),
                            BinaryOperator::Gt,
                            Expression::literal(3i64),
                        )),
                ),
        );

    let result = compile(file);
    let diagnostic = expect_code(&result, DiagnosticCode::UNKNOWN_PROPERTY);
    assert!(diagnostic.hint().unwrap_or_default().contains("score"));
}

// =============================================================================
// Validators run independently
// =============================================================================

#[test]
fn test_every_validator_reports_in_one_pass() {
    let file = SourceFile::new("ci.flow")
        .with_type("Empty", SchemaTypeNode::Object { fields: Vec::new() })
        .with_workflow(
            WorkflowNode::new("CI")
                .with_job(JobNode::plain("build", None, vec![StepNode::shell("make")]))
                .with_job(JobNode::matrix(
                    "test",
                    Some("ubuntu-latest"),
                    MatrixSpec::from_axes([("a", axis(10)), ("b", axis(10)), ("c", axis(10))]),
                    vec![StepNode::shell("make test")],
                ))
                .with_cycle(CycleNode::new(
                    "retry",
                    Some("ubuntu-latest"),
                    vec![StepNode::shell("make flaky")],
                )),
        );

    let codes = codes(&compile(file));
    for expected in [
        DiagnosticCode::MISSING_TARGET,
        DiagnosticCode::MISSING_TERMINATION,
        DiagnosticCode::EMPTY_OBJECT,
        DiagnosticCode::MATRIX_OVER_LIMIT,
    ] {
        assert!(codes.contains(&expected), "missing {} in {:?}", expected, codes);
    }
}

#[test]
fn test_unknown_needs_suggests_job() {
    let file = SourceFile::new("ci.flow").with_workflow(
        WorkflowNode::new("CI")
            .with_job(JobNode::plain("build", Some("ubuntu-latest"), vec![StepNode::shell("make")]))
            .with_job(
                JobNode::plain("deploy", Some("ubuntu-latest"), vec![StepNode::shell("make deploy")])
                    .with_needs(&["biuld"]),
            ),
    );
    let result = compile(file);
    let diagnostic = expect_code(&result, DiagnosticCode::UNKNOWN_NEEDS);
    assert_eq!(diagnostic.hint(), Some("did you mean 'build'?"));
}

#[test]
fn test_unbounded_cycle_is_a_warning() {
    let until = Expression::binary(
        Expression::path("needs.retry.outputs.done"),
        BinaryOperator::Eq,
        Expression::literal("true"),
    );
    let options = CompilerOptions {
        max_cycle_iterations: 4,
        ..CompilerOptions::default()
    };
    let file = SourceFile::new("ci.flow").with_workflow(WorkflowNode::new("CI").with_cycle(
        CycleNode::new("retry", Some("ubuntu-latest"), vec![StepNode::shell("make")]).until(until),
    ));

    let result = Compiler::with_options(options).unwrap().compile(file).unwrap();

    let warning = expect_code(&result, DiagnosticCode::UNBOUNDED_CYCLE);
    assert_eq!(warning.severity(), Severity::Warning);
    assert!(result.success);
    let text = result.text.unwrap();
    assert!(text.contains("  retry-4:\n"));
    assert!(!text.contains("retry-5"));
}

#[test]
fn test_job_colliding_with_cycle_iteration_fails() {
    let file = SourceFile::new("ci.flow").with_workflow(
        WorkflowNode::new("CI")
            .with_job(JobNode::plain("retry-2", Some("ubuntu-latest"), vec![StepNode::shell("make")]))
            .with_cycle(
                CycleNode::new("retry", Some("ubuntu-latest"), vec![StepNode::shell("./try")])
                    .max_iterations(3),
            ),
    );
    let result = compile(file);
    let diagnostic = expect_code(&result, DiagnosticCode::DUPLICATE_JOB);
    assert!(diagnostic.message().contains("iteration 2 of cycle 'retry'"));
    assert!(!result.success);
}

#[test]
fn test_job_after_cycle_survives_early_stop() {
    let until = Expression::binary(
        Expression::path("needs.retry.outputs.done"),
        BinaryOperator::Eq,
        Expression::literal("true"),
    );
    let file = SourceFile::new("ci.flow").with_workflow(
        WorkflowNode::new("CI")
            .with_cycle(
                CycleNode::new(
                    "retry",
                    Some("ubuntu-latest"),
                    vec![StepNode::shell("echo \"done=true\" >> \"$GITHUB_OUTPUT\"")],
                )
                .until(until)
                .max_iterations(2),
            )
            .with_job(
                JobNode::plain("report", Some("ubuntu-latest"), vec![StepNode::shell("make report")])
                    .with_needs(&["retry"]),
            ),
    );
    let result = compile(file);
    assert!(result.success, "{:?}", result.diagnostics);
    let parsed: serde_yaml::Value = serde_yaml::from_str(result.text.as_deref().unwrap()).unwrap();
    let report = &parsed["jobs"]["report"];
    assert_eq!(report["needs"][0].as_str(), Some("retry-2"));
    assert_eq!(report["if"].as_str(), Some("!cancelled() && !failure()"));
}

// =============================================================================
// Result shape
// =============================================================================

#[test]
fn test_success_flag_follows_errors_only() {
    let file = SourceFile::new("ci.flow").with_workflow(
        WorkflowNode::new("CI").with_job(JobNode::plain(
            "build",
            Some("ubuntu-latest"),
            vec![StepNode::shell("make"), StepNode::guard("always()", vec![])],
        )),
    );
    let result = compile(file);
    assert_eq!(codes(&result), vec![DiagnosticCode::EMPTY_GUARD]);
    assert!(result.success);
}

#[test]
fn test_result_wire_shape() {
    let result = compile(SourceFile::new("ci.flow").with_workflow(simple_workflow("CI")));
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["success"], true);
    assert!(value["diagnostics"].as_array().unwrap().is_empty());
    assert!(value["text"].as_str().unwrap().starts_with("name: CI\n"));
}

#[test]
fn test_compilation_is_deterministic() {
    let file = SourceFile::new("ci.flow")
        .with_type("Status", enumeration(&["ok", "failed"]))
        .with_workflow(
            WorkflowNode::new("CI")
                .on(&["push", "pull_request"])
                .with_job(
                    JobNode::agent(
                        "review",
                        Some("ubuntu-latest"),
                        AgentTask::new("Review the change", SchemaTypeNode::reference("Status")),
                    )
                    .with_output("verdict", SchemaTypeNode::reference("Status")),
                )
                .with_job(JobNode::matrix(
                    "test",
                    Some("${{ matrix.os }}"),
                    MatrixSpec::from_axes([(
                        "os",
                        vec![Scalar::from("ubuntu-latest"), Scalar::from("macos-latest")],
                    )]),
                    vec![StepNode::shell("  make test\n  make lint\n")],
                )),
        );

    let first = Compiler::new().compile(file.clone()).unwrap();
    let second = Compiler::new().compile(file).unwrap();
    assert!(first.success, "{:?}", first.diagnostics);
    assert_eq!(first, second);
}
