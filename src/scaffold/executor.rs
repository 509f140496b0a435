//! Sequential step runner.

use super::conditions::Condition;
use super::context::ScaffoldContext;
use super::step::{Step, StepOptions};
use crate::config::StepConfig;
use crate::core::ProgressSink;
use crate::error::{find_arbor_error, ArborError};
use anyhow::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Ran,
    Skipped(String),
    /// Dry run: the step would have executed.
    WouldRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    pub outcome: StepOutcome,
}

/// What happened to each step, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    fn record(&mut self, name: &str, outcome: StepOutcome) {
        self.steps.push(StepReport {
            name: name.to_string(),
            outcome,
        });
    }

    pub fn names_with(&self, pred: impl Fn(&StepOutcome) -> bool) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| pred(&s.outcome))
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn ran(&self) -> Vec<&str> {
        self.names_with(|o| *o == StepOutcome::Ran)
    }

    pub fn would_run(&self) -> Vec<&str> {
        self.names_with(|o| *o == StepOutcome::WouldRun)
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.names_with(|o| matches!(o, StepOutcome::Skipped(_)))
    }
}

/// Run `steps` in order against `ctx`.
///
/// The preflight condition, when given, is checked first and stops the run
/// with every missing item listed. Disabled steps and steps whose condition
/// is false are skipped. In a dry run nothing executes. The first failing
/// step aborts the run; earlier steps are not undone.
pub fn run_pipeline(
    steps: &[Box<dyn Step>],
    ctx: &ScaffoldContext,
    opts: &StepOptions,
    preflight: Option<&Condition>,
    sink: &mut dyn ProgressSink,
) -> Result<PipelineReport> {
    if let Some(condition) = preflight {
        sink.on_debug("Checking preflight conditions");
        ctx.check_preflight(condition)?;
    }

    let mut report = PipelineReport::default();

    for step in steps {
        opts.cancel.check()?;
        let name = step.name();

        if step.enabled() == Some(false) {
            sink.on_debug(&format!("Skipping {name}: disabled"));
            report.record(name, StepOutcome::Skipped("disabled".into()));
            continue;
        }

        if !step.condition(ctx) {
            sink.on_debug(&format!("Skipping {name}: condition not met"));
            report.record(name, StepOutcome::Skipped("condition not met".into()));
            continue;
        }

        if opts.dry_run {
            sink.on_step(&format!("Would run {name}"));
            report.record(name, StepOutcome::WouldRun);
            continue;
        }

        sink.on_step(&format!("Running {name}"));
        if let Err(e) = step.run(ctx, opts) {
            if matches!(find_arbor_error(&e), Some(ArborError::Aborted)) {
                return Err(e.context(format!("step {name} interrupted")));
            }
            return Err(ArborError::StepFailed {
                step: name.to_string(),
                message: format!("{e:#}"),
            }
            .into());
        }
        report.record(name, StepOutcome::Ran);
    }

    Ok(report)
}

/// Preset steps followed by project steps, or the project steps alone when
/// the project overrides the preset.
pub fn assemble_steps(
    preset_steps: &[StepConfig],
    project_steps: &[StepConfig],
    override_preset: bool,
) -> Vec<StepConfig> {
    if override_preset {
        project_steps.to_vec()
    } else {
        preset_steps.iter().chain(project_steps).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NullSink;
    use crate::error::exit_codes;
    use std::sync::{Arc, Mutex};

    /// Records its name into a shared log when run.
    struct Recorder {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        enabled: Option<bool>,
        applies: bool,
        fails: bool,
    }

    impl Recorder {
        fn boxed(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Box<dyn Step> {
            Box::new(Self {
                name: name.into(),
                log: Arc::clone(log),
                enabled: None,
                applies: true,
                fails: false,
            })
        }
    }

    impl Step for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn condition(&self, _ctx: &ScaffoldContext) -> bool {
            self.applies
        }

        fn run(&self, ctx: &ScaffoldContext, _opts: &StepOptions) -> Result<()> {
            self.log.lock().unwrap().push(self.name.clone());
            ctx.set_var(&self.name, "done");
            if self.fails {
                anyhow::bail!("boom");
            }
            Ok(())
        }

        fn enabled(&self) -> Option<bool> {
            self.enabled
        }
    }

    fn ctx() -> ScaffoldContext {
        ScaffoldContext::new("/tmp/arbor-test/wt", "main", "app")
    }

    #[test]
    fn test_runs_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            Recorder::boxed("a", &log),
            Recorder::boxed("b", &log),
            Recorder::boxed("c", &log),
        ];
        let report =
            run_pipeline(&steps, &ctx(), &StepOptions::default(), None, &mut NullSink).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(report.ran(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_disabled_and_condition_false_are_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(Recorder {
                name: "off".into(),
                log: Arc::clone(&log),
                enabled: Some(false),
                applies: true,
                fails: false,
            }),
            Box::new(Recorder {
                name: "not-applicable".into(),
                log: Arc::clone(&log),
                enabled: None,
                applies: false,
                fails: false,
            }),
            Recorder::boxed("on", &log),
        ];
        let report =
            run_pipeline(&steps, &ctx(), &StepOptions::default(), None, &mut NullSink).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["on"]);
        assert_eq!(report.skipped(), vec!["off", "not-applicable"]);
        assert_eq!(
            report.steps[0].outcome,
            StepOutcome::Skipped("disabled".into())
        );
    }

    #[test]
    fn test_dry_run_executes_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![Recorder::boxed("a", &log), Recorder::boxed("b", &log)];
        let opts = StepOptions {
            dry_run: true,
            ..Default::default()
        };
        let context = ctx();
        let report = run_pipeline(&steps, &context, &opts, None, &mut NullSink).unwrap();

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(report.would_run(), vec!["a", "b"]);
        assert_eq!(context.var("a"), None);
    }

    #[test]
    fn test_failure_aborts_and_names_step() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps: Vec<Box<dyn Step>> = vec![
            Recorder::boxed("first", &log),
            Box::new(Recorder {
                name: "broken".into(),
                log: Arc::clone(&log),
                enabled: None,
                applies: true,
                fails: true,
            }),
            Recorder::boxed("never", &log),
        ];
        let context = ctx();
        let err = run_pipeline(&steps, &context, &StepOptions::default(), None, &mut NullSink)
            .unwrap_err();

        assert_eq!(err.to_string(), "step broken failed: boom");
        assert_eq!(crate::error::exit_code_for(&err), exit_codes::STEP_FAILED);
        assert_eq!(*log.lock().unwrap(), vec!["first", "broken"]);
        // No rollback of the first step's effect
        assert_eq!(context.var("first").as_deref(), Some("done"));
    }

    #[test]
    fn test_failed_preflight_runs_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![Recorder::boxed("a", &log)];
        let preflight = Condition::command_exists(&["arbor-missing-tool"]);
        let err = run_pipeline(
            &steps,
            &ctx(),
            &StepOptions::default(),
            Some(&preflight),
            &mut NullSink,
        )
        .unwrap_err();

        assert!(err.to_string().contains("arbor-missing-tool"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_pipeline_stops_before_next_step() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![Recorder::boxed("a", &log)];
        let opts = StepOptions::default();
        opts.cancel.cancel();
        let err = run_pipeline(&steps, &ctx(), &opts, None, &mut NullSink).unwrap_err();
        assert!(matches!(find_arbor_error(&err), Some(ArborError::Aborted)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_assemble_steps_merge_rule() {
        let preset = vec![StepConfig::named("php.composer"), StepConfig::named("env.write")];
        let project = vec![StepConfig::named("bash.run")];

        let merged: Vec<String> = assemble_steps(&preset, &project, false)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(merged, vec!["php.composer", "env.write", "bash.run"]);

        let replaced: Vec<String> = assemble_steps(&preset, &project, true)
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(replaced, vec!["bash.run"]);
    }
}
