//! Named pipelines with a typed trigger.
//!
//! A [`Workflow`] validates its trigger payload against a [`TriggerSchema`] and
//! then runs its steps in order, collecting each step's output under the
//! step id. Steps are added before [`Workflow::commit`]; a committed workflow
//! is frozen.
//!
//! The shipped `cursor-rules-workflow` declares its trigger but has no steps
//! yet, so running it reports [`WorkflowError::NoSteps`].

use std::sync::Arc;

use async_trait::async_trait;
use jsonschema::{Validator, validator_for};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::WorkflowError;

pub const CURSOR_RULES_WORKFLOW: &str = "cursor-rules-workflow";

/// JSON Schema a workflow's trigger payload must satisfy.
pub struct TriggerSchema {
    schema: Value,
    validator: Validator,
}

impl TriggerSchema {
    pub fn compile(schema: Value) -> Result<Self, String> {
        let validator = validator_for(&schema).map_err(|e| format!("invalid schema: {e}"))?;
        Ok(Self { schema, validator })
    }

    pub fn as_json(&self) -> &Value {
        &self.schema
    }

    /// All violations, joined; `Ok` when the trigger conforms.
    pub fn validate(&self, trigger: &Value) -> Result<(), String> {
        let messages: Vec<String> = self
            .validator
            .iter_errors(trigger)
            .map(|e| e.to_string())
            .collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(messages.join("; "))
        }
    }
}

/// State visible to steps: the trigger plus the outputs of earlier steps.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    pub trigger: Value,
    pub step_results: Map<String, Value>,
}

/// One unit of work in a workflow.
#[async_trait]
pub trait WorkflowStep: Send + Sync {
    fn id(&self) -> &str;

    async fn execute(&self, ctx: &WorkflowContext) -> anyhow::Result<Value>;
}

/// Outputs of a completed run, keyed by step id.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    pub workflow: String,
    pub step_results: Map<String, Value>,
}

pub struct Workflow {
    name: String,
    trigger_schema: TriggerSchema,
    steps: Vec<Arc<dyn WorkflowStep>>,
    committed: bool,
}

impl Workflow {
    /// Create a workflow whose trigger must satisfy `trigger_schema`.
    pub fn new(name: impl Into<String>, trigger_schema: Value) -> Result<Self, WorkflowError> {
        let name = name.into();
        let trigger_schema =
            TriggerSchema::compile(trigger_schema).map_err(|message| WorkflowError::InvalidSchema {
                workflow: name.clone(),
                message,
            })?;
        Ok(Self {
            name,
            trigger_schema,
            steps: Vec::new(),
            committed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger_schema(&self) -> &TriggerSchema {
        &self.trigger_schema
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id()).collect()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn step(mut self, step: Arc<dyn WorkflowStep>) -> Result<Self, WorkflowError> {
        if self.committed {
            return Err(WorkflowError::AlreadyCommitted(self.name));
        }
        self.steps.push(step);
        Ok(self)
    }

    /// Freeze the step list.
    pub fn commit(mut self) -> Self {
        self.committed = true;
        self
    }

    /// Validate `trigger` and run every step in order.
    #[tracing::instrument(skip_all, fields(workflow = %self.name))]
    pub async fn run(&self, trigger: Value) -> Result<WorkflowRun, WorkflowError> {
        if !self.committed {
            return Err(WorkflowError::NotCommitted(self.name.clone()));
        }

        self.trigger_schema
            .validate(&trigger)
            .map_err(|message| WorkflowError::InvalidTrigger {
                workflow: self.name.clone(),
                message,
            })?;

        if self.steps.is_empty() {
            tracing::warn!("Workflow has no steps");
            return Err(WorkflowError::NoSteps(self.name.clone()));
        }

        let mut ctx = WorkflowContext {
            trigger,
            step_results: Map::new(),
        };

        for step in &self.steps {
            tracing::info!(step = step.id(), "Running workflow step");
            let output = step
                .execute(&ctx)
                .await
                .map_err(|e| WorkflowError::StepFailed {
                    workflow: self.name.clone(),
                    step: step.id().to_string(),
                    message: format!("{e:#}"),
                })?;
            ctx.step_results.insert(step.id().to_string(), output);
        }

        Ok(WorkflowRun {
            workflow: self.name.clone(),
            step_results: ctx.step_results,
        })
    }
}

/// The cursor-rules workflow: triggered with a repository URL, no steps yet.
pub fn cursor_rules_workflow() -> Result<Workflow, WorkflowError> {
    let schema = json!({
        "type": "object",
        "properties": {
            "repository": {
                "type": "string",
                "description": "GitHub repository URL"
            }
        },
        "required": ["repository"]
    });
    Ok(Workflow::new(CURSOR_RULES_WORKFLOW, schema)?.commit())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl WorkflowStep for Echo {
        fn id(&self) -> &str {
            self.0
        }

        async fn execute(&self, ctx: &WorkflowContext) -> anyhow::Result<Value> {
            Ok(json!({
                "repository": ctx.trigger["repository"],
                "seen": ctx.step_results.keys().cloned().collect::<Vec<_>>(),
            }))
        }
    }

    struct Fails;

    #[async_trait]
    impl WorkflowStep for Fails {
        fn id(&self) -> &str {
            "fails"
        }

        async fn execute(&self, _ctx: &WorkflowContext) -> anyhow::Result<Value> {
            anyhow::bail!("boom")
        }
    }

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": { "repository": { "type": "string" } },
            "required": ["repository"]
        })
    }

    #[tokio::test]
    async fn cursor_rules_workflow_has_no_steps() {
        let wf = cursor_rules_workflow().unwrap();
        assert_eq!(wf.name(), "cursor-rules-workflow");
        assert!(wf.is_committed());
        assert!(wf.step_ids().is_empty());

        let err = wf
            .run(json!({"repository": "https://github.com/user/repo"}))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NoSteps(_)));
    }

    #[tokio::test]
    async fn trigger_is_validated_before_steps() {
        let wf = cursor_rules_workflow().unwrap();

        let err = wf.run(json!({})).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTrigger { .. }), "got {err}");
        assert!(err.to_string().contains("repository"), "got {err}");

        let err = wf.run(json!({"repository": 7})).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTrigger { .. }), "got {err}");
        assert!(err.to_string().contains("string"), "got {err}");

        let err = wf.run(json!("https://github.com/u/r")).await.unwrap_err();
        assert!(err.to_string().contains("object"), "got {err}");
    }

    #[tokio::test]
    async fn steps_run_in_order_and_see_earlier_results() {
        let wf = Workflow::new("wf", schema())
            .unwrap()
            .step(Arc::new(Echo("first")))
            .unwrap()
            .step(Arc::new(Echo("second")))
            .unwrap()
            .commit();

        let run = wf.run(json!({"repository": "https://github.com/u/r"})).await.unwrap();

        assert_eq!(run.step_results["first"]["seen"], json!([]));
        assert_eq!(run.step_results["second"]["seen"], json!(["first"]));
        assert_eq!(run.step_results["second"]["repository"], "https://github.com/u/r");
    }

    #[tokio::test]
    async fn step_failure_names_the_step() {
        let wf = Workflow::new("wf", schema())
            .unwrap()
            .step(Arc::new(Fails))
            .unwrap()
            .commit();

        let err = wf.run(json!({"repository": "x"})).await.unwrap_err();
        match err {
            WorkflowError::StepFailed { step, message, .. } => {
                assert_eq!(step, "fails");
                assert_eq!(message, "boom");
            }
            other => panic!("Expected StepFailed, got: {other}"),
        }
    }

    #[tokio::test]
    async fn uncommitted_workflow_does_not_run() {
        let wf = Workflow::new("wf", schema()).unwrap();
        let err = wf.run(json!({"repository": "x"})).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotCommitted(_)));
    }

    #[test]
    fn committed_workflow_rejects_new_steps() {
        let result = Workflow::new("wf", schema())
            .unwrap()
            .commit()
            .step(Arc::new(Echo("late")));
        assert!(matches!(result, Err(WorkflowError::AlreadyCommitted(_))));
    }

    #[test]
    fn undeclared_trigger_keys_are_allowed() {
        let wf = cursor_rules_workflow().unwrap();
        let trigger = json!({"repository": "https://github.com/u/r", "extra": true});
        assert!(wf.trigger_schema().validate(&trigger).is_ok());
        assert_eq!(wf.trigger_schema().as_json()["required"], json!(["repository"]));
    }

    #[test]
    fn invalid_schema_is_rejected_at_construction() {
        let err = Workflow::new("wf", json!({"type": 12})).err().unwrap();
        assert!(matches!(err, WorkflowError::InvalidSchema { .. }), "got {err}");
    }
}
