use crate::controller::{SyncController, TaskView};
use crate::remote::RemoteStore;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create { title: String, time: u64 },
    Toggle { id: String },
    Delete { id: String },
    Shutdown,
}

/// Drives a controller on a single task: user actions and countdown ticks
/// are handled one at a time, and every change is published as a view.
pub struct Session<R> {
    controller: SyncController<R>,
}

impl<R: RemoteStore> Session<R> {
    pub fn new(controller: SyncController<R>) -> Self {
        Self { controller }
    }

    /// Runs until `Action::Shutdown` or until every action sender is gone,
    /// then saves a final snapshot and hands the controller back. The final
    /// save is skipped when the initial load never succeeded.
    pub async fn run(
        mut self,
        mut actions: mpsc::Receiver<Action>,
        views: watch::Sender<TaskView>,
    ) -> SyncController<R> {
        publish(&views, TaskView {
            loading: true,
            ..self.controller.view()
        });
        if let Err(err) = self.controller.initial_load().await {
            tracing::warn!(error = %err, "initial load failed");
        }
        publish(&views, self.controller.view());

        loop {
            tokio::select! {
                action = actions.recv() => {
                    let Some(action) = action else { break };
                    if action == Action::Shutdown {
                        break;
                    }
                    self.apply(action).await;
                }
                _ = self.controller.next_tick() => {}
            }
            publish(&views, self.controller.view());
        }

        self.controller.persist();
        self.controller
    }

    async fn apply(&mut self, action: Action) {
        let outcome = match action {
            Action::Create { title, time } => {
                self.controller.create(&title, time).await.map(|_| ())
            }
            Action::Toggle { id } => self.controller.toggle(&id).await.map(|_| ()),
            Action::Delete { id } => self.controller.delete(&id).await.map(|_| ()),
            Action::Shutdown => Ok(()),
        };
        if let Err(err) = outcome {
            tracing::warn!(error = %err, "action failed");
        }
    }
}

// A closed view channel only means nobody is watching anymore.
fn publish(views: &watch::Sender<TaskView>, view: TaskView) {
    views.send_replace(view);
}
