//! Pipeline executor with persisted run logs.
//!
//! Every transition is appended to `<log_dir>/transitions.jsonl` as it
//! happens, and the complete run log is written to
//! `<log_dir>/run-<run_id>.json` when the run reaches `Done` or `Failed`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::pipeline::{PipelineState, Transition};
use crate::session::SessionState;
use crate::stage::{Stage, StageReport};

/// File receiving one JSON line per transition, across runs.
pub const TRANSITIONS_FILE: &str = "transitions.jsonl";

/// Persistent log of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub run_id: Uuid,
    pub state: PipelineState,
    pub transitions: Vec<Transition>,
    pub reports: Vec<StageReport>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Stage that failed, if any
    pub failed_stage: Option<String>,
    /// Error message if failed
    pub error: Option<String>,
    /// Session keys present when the run ended
    pub session_keys: Vec<String>,
    pub log_dir: PathBuf,
}

impl RunLog {
    pub fn new(run_id: Uuid, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_id,
            state: PipelineState::Start,
            transitions: Vec::new(),
            reports: Vec::new(),
            started_at: None,
            completed_at: None,
            failed_stage: None,
            error: None,
            session_keys: Vec::new(),
            log_dir: log_dir.into(),
        }
    }

    /// Path of the persisted run log.
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(format!("run-{}.json", self.run_id))
    }

    /// Save the log to disk.
    pub fn save(&self) -> CoreResult<()> {
        fs::create_dir_all(&self.log_dir)?;
        let path = self.log_path();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        debug!("Saved run log to {:?}", path);
        Ok(())
    }

    /// Load a log from disk.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn succeeded(&self) -> bool {
        self.state == PipelineState::Done
    }

    /// Report of a stage by name.
    pub fn report(&self, stage: &str) -> Option<&StageReport> {
        self.reports.iter().find(|r| r.stage == stage)
    }

    /// Apply a transition, record it, and append it to the transitions file.
    ///
    /// The in-memory log is updated before anything is written, so a write
    /// error leaves the log in the new state.
    fn advance(&mut self, to: PipelineState, message: Option<String>) -> CoreResult<()> {
        let from = self.state;
        self.state = from.transition(to)?;

        let mut transition = Transition::new(from, to);
        if let Some(message) = message {
            transition = transition.with_message(message);
        }
        info!("Run {}: {} -> {}", self.run_id, from, to);

        let written = append_transition(&self.log_dir, self.run_id, &transition);
        self.transitions.push(transition);
        written
    }

    /// Move the run to `Failed` and persist what can be persisted.
    ///
    /// Write errors are logged and dropped; the returned error is always
    /// `StageFailed` for `stage`.
    fn fail(&mut self, stage: &str, cause: CoreError, session: &SessionState) -> CoreError {
        error!("Stage '{}' failed: {}", stage, cause);
        let message = cause.to_string();

        self.failed_stage = Some(stage.to_string());
        self.error = Some(message.clone());
        self.completed_at = Some(Utc::now());
        self.session_keys = session.keys().iter().map(|k| k.to_string()).collect();

        if let Err(e) = self.advance(PipelineState::Failed, Some(message)) {
            warn!("Run {}: could not record failed transition: {}", self.run_id, e);
        }
        if let Err(e) = self.save() {
            warn!("Run {}: could not save run log: {}", self.run_id, e);
        }

        match cause {
            failure @ CoreError::StageFailed { .. } => failure,
            other => CoreError::stage_failed(stage, other),
        }
    }
}

#[derive(Serialize)]
struct TransitionLine<'a> {
    run_id: Uuid,
    #[serde(flatten)]
    transition: &'a Transition,
}

fn append_transition(log_dir: &Path, run_id: Uuid, transition: &Transition) -> CoreResult<()> {
    fs::create_dir_all(log_dir)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(TRANSITIONS_FILE))?;
    let json = serde_json::to_string(&TransitionLine { run_id, transition })?;
    writeln!(file, "{}", json)?;
    Ok(())
}

/// The linear pipeline: one stage per working state.
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    log_dir: PathBuf,
}

impl Pipeline {
    /// Build a pipeline. Exactly one stage must be registered for each
    /// working state; registration order does not matter.
    pub fn new(log_dir: impl Into<PathBuf>, stages: Vec<Arc<dyn Stage>>) -> CoreResult<Self> {
        let mut ordered = Vec::with_capacity(3);
        for state in PipelineState::working_states() {
            let mut matching = stages.iter().filter(|s| s.state() == state);
            let stage = matching.next().ok_or(CoreError::StageNotFound(state))?;
            if matching.next().is_some() {
                return Err(CoreError::DuplicateStage(state));
            }
            ordered.push(Arc::clone(stage));
        }

        if let Some(stray) = stages
            .iter()
            .find(|s| !PipelineState::working_states().contains(&s.state()))
        {
            return Err(CoreError::InvalidTransition {
                from: PipelineState::Start,
                to: stray.state(),
            });
        }

        Ok(Self {
            stages: ordered,
            log_dir: log_dir.into(),
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order.
    ///
    /// On a stage error, or when a transition cannot be written, the run
    /// moves to `Failed`, the log is persisted on a best-effort basis and
    /// `StageFailed` is returned. Whatever the earlier stages wrote to the
    /// session stays there.
    pub async fn execute(&self, session: &mut SessionState) -> CoreResult<RunLog> {
        let mut log = RunLog::new(session.run_id, &self.log_dir);
        log.started_at = Some(Utc::now());
        info!("Starting pipeline run {}", log.run_id);

        for stage in &self.stages {
            if let Err(e) = log.advance(stage.state(), Some(format!("running {}", stage.name()))) {
                return Err(log.fail(stage.name(), e, session));
            }

            let started_at = Utc::now();
            match stage.run(session).await {
                Ok(mut report) => {
                    report.started_at = started_at;
                    report.completed_at = Utc::now();
                    info!("Stage '{}' completed", stage.name());
                    log.reports.push(report);
                }
                Err(e) => return Err(log.fail(stage.name(), e, session)),
            }
        }

        log.advance(PipelineState::Done, None)?;
        log.completed_at = Some(Utc::now());
        log.session_keys = session.keys().iter().map(|k| k.to_string()).collect();
        log.save()?;

        info!("Pipeline run {} completed", log.run_id);
        Ok(log)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct WriteStage {
        name: &'static str,
        state: PipelineState,
        key: &'static str,
    }

    #[async_trait]
    impl Stage for WriteStage {
        fn name(&self) -> &str {
            self.name
        }

        fn state(&self) -> PipelineState {
            self.state
        }

        async fn run(&self, session: &mut SessionState) -> CoreResult<StageReport> {
            session.set_from(self.name, self.key, &self.name)?;
            Ok(StageReport::new(self.name).produced(self.key))
        }
    }

    struct FailingStage(PipelineState);

    #[async_trait]
    impl Stage for FailingStage {
        fn name(&self) -> &str {
            "broken"
        }

        fn state(&self) -> PipelineState {
            self.0
        }

        async fn run(&self, _session: &mut SessionState) -> CoreResult<StageReport> {
            Err(CoreError::KeyNotFound("records".to_string()))
        }
    }

    /// Replaces the transitions file with a directory, then fails.
    struct BlockLogStage(PathBuf);

    #[async_trait]
    impl Stage for BlockLogStage {
        fn name(&self) -> &str {
            "blocker"
        }

        fn state(&self) -> PipelineState {
            PipelineState::Analytics
        }

        async fn run(&self, _session: &mut SessionState) -> CoreResult<StageReport> {
            let transitions = self.0.join(TRANSITIONS_FILE);
            fs::remove_file(&transitions)?;
            fs::create_dir(&transitions)?;
            Err(CoreError::KeyNotFound("records".to_string()))
        }
    }

    fn stage(name: &'static str, state: PipelineState, key: &'static str) -> Arc<dyn Stage> {
        Arc::new(WriteStage { name, state, key })
    }

    fn happy_stages() -> Vec<Arc<dyn Stage>> {
        vec![
            stage("writer", PipelineState::InsightWriting, "summary"),
            stage("intake", PipelineState::Intake, "records"),
            stage("analytics", PipelineState::Analytics, "kpis"),
        ]
    }

    #[test]
    fn test_pipeline_orders_stages_by_state() {
        let pipeline = Pipeline::new("logs", happy_stages()).unwrap();
        assert_eq!(pipeline.stage_names(), vec!["intake", "analytics", "writer"]);
    }

    #[test]
    fn test_pipeline_rejects_missing_and_duplicate_stages() {
        let missing = vec![stage("intake", PipelineState::Intake, "records")];
        assert!(matches!(
            Pipeline::new("logs", missing),
            Err(CoreError::StageNotFound(PipelineState::Analytics))
        ));

        let mut duplicate = happy_stages();
        duplicate.push(stage("again", PipelineState::Intake, "other"));
        assert!(matches!(
            Pipeline::new("logs", duplicate),
            Err(CoreError::DuplicateStage(PipelineState::Intake))
        ));

        let mut stray = happy_stages();
        stray.push(stage("done", PipelineState::Done, "x"));
        assert!(Pipeline::new("logs", stray).is_err());
    }

    #[tokio::test]
    async fn test_execute_happy_path() {
        let temp = tempdir().unwrap();
        let pipeline = Pipeline::new(temp.path(), happy_stages()).unwrap();
        let mut session = SessionState::new();

        let log = pipeline.execute(&mut session).await.unwrap();

        assert!(log.succeeded());
        let states: Vec<PipelineState> = log.transitions.iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![
                PipelineState::Intake,
                PipelineState::Analytics,
                PipelineState::InsightWriting,
                PipelineState::Done,
            ]
        );
        assert_eq!(log.reports.len(), 3);
        assert_eq!(log.session_keys, vec!["kpis", "records", "summary"]);

        let saved = RunLog::load(&log.log_path()).unwrap();
        assert_eq!(saved.state, PipelineState::Done);

        let lines = fs::read_to_string(temp.path().join(TRANSITIONS_FILE)).unwrap();
        assert_eq!(lines.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_execute_failure_keeps_partial_session() {
        let temp = tempdir().unwrap();
        let stages: Vec<Arc<dyn Stage>> = vec![
            stage("intake", PipelineState::Intake, "records"),
            Arc::new(FailingStage(PipelineState::Analytics)),
            stage("writer", PipelineState::InsightWriting, "summary"),
        ];
        let pipeline = Pipeline::new(temp.path(), stages).unwrap();
        let mut session = SessionState::new();

        let err = pipeline.execute(&mut session).await.unwrap_err();
        assert!(matches!(err, CoreError::StageFailed { ref stage, .. } if stage == "broken"));

        // Intake output is still readable, the writer never ran
        let records: String = session.get("records").unwrap();
        assert_eq!(records, "intake");
        assert!(!session.contains("summary"));

        let path = temp.path().join(format!("run-{}.json", session.run_id));
        let log = RunLog::load(&path).unwrap();
        assert_eq!(log.state, PipelineState::Failed);
        assert_eq!(log.failed_stage.as_deref(), Some("broken"));
        let last = log.transitions.last().unwrap();
        assert_eq!((last.from, last.to), (PipelineState::Analytics, PipelineState::Failed));
        assert!(log.error.unwrap().contains("records"));
    }

    #[tokio::test]
    async fn test_failure_survives_transition_write_error() {
        let temp = tempdir().unwrap();
        let stages: Vec<Arc<dyn Stage>> = vec![
            stage("intake", PipelineState::Intake, "records"),
            Arc::new(BlockLogStage(temp.path().to_path_buf())),
            stage("writer", PipelineState::InsightWriting, "summary"),
        ];
        let pipeline = Pipeline::new(temp.path(), stages).unwrap();
        let mut session = SessionState::new();

        let err = pipeline.execute(&mut session).await.unwrap_err();
        match &err {
            CoreError::StageFailed { stage, source } => {
                assert_eq!(stage, "blocker");
                assert!(source.to_string().contains("records"));
            }
            other => panic!("expected StageFailed, got {:?}", other),
        }

        let path = temp.path().join(format!("run-{}.json", session.run_id));
        let log = RunLog::load(&path).unwrap();
        assert_eq!(log.state, PipelineState::Failed);
        assert_eq!(log.failed_stage.as_deref(), Some("blocker"));
        assert_eq!(log.transitions.last().unwrap().to, PipelineState::Failed);
    }

    #[tokio::test]
    async fn test_unwritable_log_dir_fails_run() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();
        let pipeline = Pipeline::new(blocker.join("logs"), happy_stages()).unwrap();
        let mut session = SessionState::new();

        let err = pipeline.execute(&mut session).await.unwrap_err();
        match &err {
            CoreError::StageFailed { stage, source } => {
                assert_eq!(stage, "intake");
                assert!(matches!(source.downcast_ref::<CoreError>(), Some(CoreError::Io(_))));
            }
            other => panic!("expected StageFailed, got {:?}", other),
        }
        assert!(!session.contains("records"));
    }
}
