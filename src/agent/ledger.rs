//! Task ledger: goals, their success criteria, and status transitions.
//!
//! Tasks are never deleted, only moved between three buckets (pending,
//! active, finished). A task lives in exactly one bucket at a time, and
//! a finished task (completed or failed) is frozen: its criteria can no
//! longer change.
//!
//! A task with criteria is complete only when every criterion has been
//! verified. A task without criteria can only be completed by the caller,
//! typically from the conversational fallback signal.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::{PilotError, Result};
use crate::utils::string::preview;

/// Lifecycle state of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Active,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Completed or failed.
    pub fn is_finished(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Active => write!(f, "active"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One independently verifiable condition of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Criterion {
    pub text: String,
    /// Command that last verified this criterion
    pub verification_command: Option<String>,
    pub verified: bool,
}

impl Criterion {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            verification_command: None,
            verified: false,
        }
    }
}

/// A user goal tracked through the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub criteria: Vec<Criterion>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub result: Option<String>,
}

impl Task {
    fn new(description: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.to_string(),
            criteria: Vec::new(),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            result: None,
        }
    }

    fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Number of verified criteria.
    pub fn verified_count(&self) -> usize {
        self.criteria.iter().filter(|c| c.verified).count()
    }
}

/// True iff the task has at least one criterion and all are verified.
///
/// Conversational signals play no part here; a task without criteria is
/// never considered verified.
pub fn verify_task_completion(task: &Task) -> bool {
    !task.criteria.is_empty() && task.criteria.iter().all(|c| c.verified)
}

/// Where a task sits in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Pending,
    Active,
    Finished,
}

/// Outcome of [`TaskLedger::verify_criterion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The criterion is verified; other criteria remain open
    Recorded,
    /// That was the last open criterion; the task is now completed
    TaskCompleted,
}

/// Holds every task of the process, bucketed by status.
#[derive(Debug, Default)]
pub struct TaskLedger {
    pending: Vec<Task>,
    active: Vec<Task>,
    finished: Vec<Task>,
    /// Most recently activated task
    current: Option<String>,
}

impl TaskLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending task and return its id.
    pub fn create_task(&mut self, description: &str) -> String {
        let task = Task::new(description);
        let id = task.id.clone();
        info!(task_id = %id, description = %preview(description, 60), "Task created");
        self.pending.push(task);
        id
    }

    /// Create a task and make it the active one.
    pub fn open_task(&mut self, description: &str) -> String {
        let id = self.create_task(description);
        // Freshly created tasks are always pending, so activation cannot fail
        let _ = self.activate(&id);
        id
    }

    /// Move a pending task to active and point `current` at it.
    ///
    /// Activating an already active task only moves the pointer. Finished
    /// tasks cannot be reactivated.
    pub fn activate(&mut self, id: &str) -> Result<()> {
        match self.locate(id) {
            Some((Bucket::Pending, idx)) => {
                let mut task = self.pending.remove(idx);
                task.set_status(TaskStatus::Active);
                self.active.push(task);
            }
            Some((Bucket::Active, _)) => {}
            Some((Bucket::Finished, _)) => {
                return Err(PilotError::Tool(format!("Task {} is already finished", id)));
            }
            None => return Err(PilotError::NotFound(format!("task {}", id))),
        }
        info!(task_id = %id, "Task activated");
        self.current = Some(id.to_string());
        Ok(())
    }

    /// The most recently activated task, whatever bucket it is in now.
    pub fn current(&self) -> Option<&Task> {
        self.current.as_deref().and_then(|id| self.get(id))
    }

    /// The most recently activated task if it is still active.
    pub fn current_active(&self) -> Option<&Task> {
        self.current()
            .filter(|task| task.status == TaskStatus::Active)
    }

    /// Make the most recently activated task active again if it was demoted.
    ///
    /// Returns its id, or `None` when there is no current task or it has
    /// already finished.
    pub fn resume_current(&mut self) -> Option<String> {
        let id = self.current.clone()?;
        match self.locate(&id)? {
            (Bucket::Finished, _) => None,
            _ => self.activate(&id).ok().map(|_| id),
        }
    }

    /// Look up a task in any bucket.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks().find(|t| t.id == id)
    }

    /// Iterate every task: pending, then active, then finished.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.pending
            .iter()
            .chain(self.active.iter())
            .chain(self.finished.iter())
    }

    /// Append unverified criteria to `id` if it is the current active task.
    ///
    /// Returns `false` (and changes nothing) for any other task.
    pub fn define_criteria(&mut self, id: &str, criteria: &[String]) -> bool {
        if self.current_active().map(|t| t.id.as_str()) != Some(id) {
            return false;
        }
        let Some(task) = self.active.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        task.criteria
            .extend(criteria.iter().map(|text| Criterion::new(text)));
        task.updated_at = Utc::now();
        info!(task_id = %id, added = criteria.len(), total = task.criteria.len(), "Criteria defined");
        true
    }

    /// Mark criterion `index` of active task `id` as verified by `command`,
    /// completing the task if it was the last open criterion.
    pub fn verify_criterion(
        &mut self,
        id: &str,
        index: usize,
        command: &str,
    ) -> Result<Verification> {
        let task = self
            .active
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| PilotError::NotFound(format!("active task {}", id)))?;
        let criterion = task.criteria.get_mut(index).ok_or_else(|| {
            PilotError::NotFound(format!("criterion {} of task {}", index, id))
        })?;

        criterion.verified = true;
        criterion.verification_command = Some(command.to_string());
        task.updated_at = Utc::now();
        info!(task_id = %id, criterion = index, "Criterion verified");

        if verify_task_completion(task) {
            self.complete(id, Some("All success criteria verified".to_string()))?;
            return Ok(Verification::TaskCompleted);
        }
        Ok(Verification::Recorded)
    }

    /// Move a task to finished as completed. Finished tasks are left as-is.
    pub fn complete(&mut self, id: &str, result: Option<String>) -> Result<()> {
        self.finish(id, TaskStatus::Completed, result)
    }

    /// Move a task to finished as failed. Finished tasks are left as-is.
    pub fn fail(&mut self, id: &str, reason: Option<String>) -> Result<()> {
        self.finish(id, TaskStatus::Failed, reason)
    }

    fn finish(&mut self, id: &str, status: TaskStatus, result: Option<String>) -> Result<()> {
        let mut task = match self.locate(id) {
            Some((Bucket::Pending, idx)) => self.pending.remove(idx),
            Some((Bucket::Active, idx)) => self.active.remove(idx),
            Some((Bucket::Finished, _)) => return Ok(()),
            None => return Err(PilotError::NotFound(format!("task {}", id))),
        };
        task.set_status(status);
        task.result = result;
        info!(task_id = %id, status = %status, "Task finished");
        self.finished.push(task);
        Ok(())
    }

    /// Return an active task to pending, e.g. after a declined action.
    pub fn demote(&mut self, id: &str) -> Result<()> {
        match self.locate(id) {
            Some((Bucket::Active, idx)) => {
                let mut task = self.active.remove(idx);
                task.set_status(TaskStatus::Pending);
                info!(task_id = %id, "Task returned to pending");
                self.pending.push(task);
                Ok(())
            }
            Some((Bucket::Pending, _)) => Ok(()),
            Some((Bucket::Finished, _)) => {
                Err(PilotError::Tool(format!("Task {} is already finished", id)))
            }
            None => Err(PilotError::NotFound(format!("task {}", id))),
        }
    }

    /// Drop every task.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.active.clear();
        self.finished.clear();
        self.current = None;
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty() && self.finished.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn completed_count(&self) -> usize {
        self.count_finished(TaskStatus::Completed)
    }

    pub fn failed_count(&self) -> usize {
        self.count_finished(TaskStatus::Failed)
    }

    fn count_finished(&self, status: TaskStatus) -> usize {
        self.finished.iter().filter(|t| t.status == status).count()
    }

    /// Human-readable report for the `/tasks` command.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Tasks: {} active, {} pending, {} completed, {} failed",
            self.active_count(),
            self.pending_count(),
            self.completed_count(),
            self.failed_count()
        );
        for task in self.tasks() {
            out.push_str(&format!(
                "\n  [{}] {}",
                task.status,
                preview(&task.description, 70)
            ));
            if !task.criteria.is_empty() {
                out.push_str(&format!(
                    " ({}/{} criteria verified)",
                    task.verified_count(),
                    task.criteria.len()
                ));
            }
        }
        out
    }

    fn locate(&self, id: &str) -> Option<(Bucket, usize)> {
        if let Some(idx) = self.pending.iter().position(|t| t.id == id) {
            return Some((Bucket::Pending, idx));
        }
        if let Some(idx) = self.active.iter().position(|t| t.id == id) {
            return Some((Bucket::Active, idx));
        }
        self.finished
            .iter()
            .position(|t| t.id == id)
            .map(|idx| (Bucket::Finished, idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_open_task_is_active_and_current() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("create a readme");
        let task = ledger.current_active().unwrap();
        assert_eq!(task.id, id);
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(ledger.active_count(), 1);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_task_lives_in_exactly_one_bucket() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("goal");
        ledger.demote(&id).unwrap();
        ledger.activate(&id).unwrap();
        ledger.complete(&id, None).unwrap();
        assert_eq!(ledger.tasks().filter(|t| t.id == id).count(), 1);
        assert_eq!(ledger.completed_count(), 1);
    }

    #[test]
    fn test_verify_task_completion_requires_criteria() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("goal");
        assert!(!verify_task_completion(ledger.get(&id).unwrap()));
    }

    #[test]
    fn test_verify_all_criteria_completes_task() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("goal");
        assert!(ledger.define_criteria(&id, &criteria(&["file exists", "tests pass"])));

        let first = ledger.verify_criterion(&id, 0, "test -f a").unwrap();
        assert_eq!(first, Verification::Recorded);
        assert_eq!(ledger.get(&id).unwrap().status, TaskStatus::Active);

        let second = ledger.verify_criterion(&id, 1, "cargo test").unwrap();
        assert_eq!(second, Verification::TaskCompleted);
        let task = ledger.get(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(verify_task_completion(task));
        assert_eq!(
            task.criteria[1].verification_command.as_deref(),
            Some("cargo test")
        );
    }

    #[test]
    fn test_define_criteria_ignores_non_current_task() {
        let mut ledger = TaskLedger::new();
        let old = ledger.open_task("first");
        let _new = ledger.open_task("second");
        assert!(!ledger.define_criteria(&old, &criteria(&["x"])));
        assert!(ledger.get(&old).unwrap().criteria.is_empty());
        assert!(!ledger.define_criteria("bogus", &criteria(&["x"])));
    }

    #[test]
    fn test_finished_task_is_frozen() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("goal");
        ledger.define_criteria(&id, &criteria(&["a", "b"]));
        ledger.complete(&id, Some("done".into())).unwrap();

        assert!(!ledger.define_criteria(&id, &criteria(&["c"])));
        assert!(ledger.verify_criterion(&id, 0, "true").is_err());
        let task = ledger.get(&id).unwrap();
        assert_eq!(task.criteria.len(), 2);
        assert!(task.criteria.iter().all(|c| !c.verified));

        // Later transitions do not rewrite a finished task
        ledger.fail(&id, Some("late".into())).unwrap();
        assert_eq!(ledger.get(&id).unwrap().status, TaskStatus::Completed);
        assert!(ledger.activate(&id).is_err());
        assert!(ledger.demote(&id).is_err());
    }

    #[test]
    fn test_finishing_unknown_task_is_error() {
        let mut ledger = TaskLedger::new();
        assert!(matches!(
            ledger.complete("missing", None),
            Err(PilotError::NotFound(_))
        ));
        assert!(matches!(
            ledger.fail("missing", None),
            Err(PilotError::NotFound(_))
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_verify_criterion_out_of_range() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("goal");
        ledger.define_criteria(&id, &criteria(&["a"]));
        assert!(matches!(
            ledger.verify_criterion(&id, 5, "true"),
            Err(PilotError::NotFound(_))
        ));
    }

    #[test]
    fn test_demote_and_resume_current() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("goal");
        ledger.demote(&id).unwrap();
        assert!(ledger.current_active().is_none());
        assert_eq!(ledger.current().unwrap().status, TaskStatus::Pending);

        assert_eq!(ledger.resume_current().as_deref(), Some(id.as_str()));
        assert_eq!(ledger.current_active().unwrap().id, id);
    }

    #[test]
    fn test_resume_current_skips_finished() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("goal");
        ledger.fail(&id, None).unwrap();
        assert!(ledger.resume_current().is_none());
        assert_eq!(ledger.failed_count(), 1);
    }

    #[test]
    fn test_reset_empties_ledger() {
        let mut ledger = TaskLedger::new();
        let a = ledger.open_task("a");
        ledger.open_task("b");
        ledger.complete(&a, None).unwrap();
        ledger.reset();
        assert!(ledger.is_empty());
        assert!(ledger.current().is_none());
        ledger.reset();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_summary_lists_tasks() {
        let mut ledger = TaskLedger::new();
        let id = ledger.open_task("write the changelog");
        ledger.define_criteria(&id, &criteria(&["file exists"]));
        let summary = ledger.summary();
        assert!(summary.starts_with("Tasks: 1 active, 0 pending, 0 completed, 0 failed"));
        assert!(summary.contains("[active] write the changelog (0/1 criteria verified)"));
    }
}
