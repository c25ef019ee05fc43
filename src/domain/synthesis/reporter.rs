use super::error::SynthesisServiceError;
use super::TaskStatusResponse;
use crate::infrastructure::repositories::TaskRepository;
use std::sync::Arc;
use uuid::Uuid;

/// Read-only translation of a persisted task into the polling payload.
pub struct StatusReporter {
    task_repo: Arc<dyn TaskRepository>,
}

impl StatusReporter {
    pub fn new(task_repo: Arc<dyn TaskRepository>) -> Self {
        Self { task_repo }
    }

    pub async fn get_status(
        &self,
        task_id: Uuid,
    ) -> Result<TaskStatusResponse, SynthesisServiceError> {
        let task = self
            .task_repo
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| SynthesisServiceError::NotFound(format!("synthesis task {task_id}")))?;

        Ok(TaskStatusResponse::from(&task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::synthesis::model::{SegmentResult, SynthesisTask, TaskStatus};
    use crate::error::AppResult;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeTasks {
        tasks: Mutex<HashMap<Uuid, SynthesisTask>>,
    }

    #[async_trait]
    impl TaskRepository for FakeTasks {
        async fn insert(&self, task: &SynthesisTask) -> AppResult<()> {
            self.tasks.lock().unwrap().insert(task.id, task.clone());
            Ok(())
        }

        async fn find_by_id(&self, task_id: Uuid) -> AppResult<Option<SynthesisTask>> {
            Ok(self.tasks.lock().unwrap().get(&task_id).cloned())
        }

        async fn update(&self, task: &mut SynthesisTask) -> AppResult<()> {
            task.version += 1;
            self.tasks.lock().unwrap().insert(task.id, task.clone());
            Ok(())
        }
    }

    fn reporter_with(task: SynthesisTask) -> (StatusReporter, Uuid) {
        let task_id = task.id;
        let mut tasks = HashMap::new();
        tasks.insert(task_id, task);
        (
            StatusReporter::new(Arc::new(FakeTasks {
                tasks: Mutex::new(tasks),
            })),
            task_id,
        )
    }

    #[tokio::test]
    async fn it_reports_progress_percentage_for_running_task() {
        let mut task = SynthesisTask::new(Uuid::new_v4(), 4);
        task.begin_processing().unwrap();
        task.record_result(SegmentResult::ok(0, "/audio/a.wav".into()))
            .unwrap();
        let (reporter, task_id) = reporter_with(task);

        let status = reporter.get_status(task_id).await.unwrap();
        assert_eq!(status.status, TaskStatus::Processing);
        assert_eq!(status.progress.completed, 1);
        assert_eq!(status.progress.total, 4);
        assert_eq!(status.progress.percentage, 25);
        // Results are withheld until the task completes.
        assert!(status.results.is_none());
        assert!(status.success.is_none());
    }

    #[tokio::test]
    async fn it_exposes_results_and_success_only_when_completed() {
        let mut task = SynthesisTask::new(Uuid::new_v4(), 1);
        task.begin_processing().unwrap();
        task.record_result(SegmentResult::err(0, "provider down".into()))
            .unwrap();
        task.complete().unwrap();
        let (reporter, task_id) = reporter_with(task);

        let status = reporter.get_status(task_id).await.unwrap();
        assert_eq!(status.status, TaskStatus::Completed);
        assert_eq!(status.success, Some(false));
        assert_eq!(status.results.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn it_exposes_error_for_failed_task() {
        let mut task = SynthesisTask::new(Uuid::new_v4(), 2);
        task.fail("storage down".into()).unwrap();
        let (reporter, task_id) = reporter_with(task);

        let status = reporter.get_status(task_id).await.unwrap();
        assert_eq!(status.status, TaskStatus::Failed);
        assert_eq!(status.error.as_deref(), Some("storage down"));
        assert!(status.results.is_none());
    }

    #[tokio::test]
    async fn it_signals_not_found_for_unknown_task() {
        let (reporter, _) = reporter_with(SynthesisTask::new(Uuid::new_v4(), 1));
        let err = reporter.get_status(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SynthesisServiceError::NotFound(_)));
    }
}
