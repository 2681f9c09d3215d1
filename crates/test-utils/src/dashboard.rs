//! Dashboard that records every task and state transition for assertions.

use std::sync::{Arc, Mutex};

use forage::{Dashboard, Task, TaskState};

pub struct RecordedTask {
    pub verb: String,
    pub name: String,
    states: Mutex<Vec<TaskState>>,
    output: Mutex<String>,
}

impl RecordedTask {
    /// Full state history, oldest first.
    pub fn states(&self) -> Vec<TaskState> {
        self.states.lock().unwrap().clone()
    }

    pub fn last_state(&self) -> Option<TaskState> {
        self.states.lock().unwrap().last().copied()
    }

    pub fn output(&self) -> String {
        self.output.lock().unwrap().clone()
    }
}

impl Task for RecordedTask {
    fn set_state(&self, state: TaskState) {
        self.states.lock().unwrap().push(state);
    }

    fn add_output(&self, text: &str) {
        self.output.lock().unwrap().push_str(text);
    }
}

#[derive(Default, Clone)]
pub struct RecordingDashboard {
    tasks: Arc<Mutex<Vec<Arc<RecordedTask>>>>,
}

impl RecordingDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> Vec<Arc<RecordedTask>> {
        self.tasks.lock().unwrap().clone()
    }

    /// First task whose display name contains `name_fragment`.
    pub fn find(&self, name_fragment: &str) -> Option<Arc<RecordedTask>> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.name.contains(name_fragment))
            .cloned()
    }

    /// Number of tasks whose *latest* state is `state`.
    pub fn count_in_state(&self, state: TaskState) -> usize {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.last_state() == Some(state))
            .count()
    }
}

impl Dashboard for RecordingDashboard {
    fn begin_task(&self, verb: &str, display_name: &str) -> Arc<dyn Task> {
        let task = Arc::new(RecordedTask {
            verb: verb.to_string(),
            name: display_name.to_string(),
            states: Mutex::new(Vec::new()),
            output: Mutex::new(String::new()),
        });
        self.tasks.lock().unwrap().push(Arc::clone(&task));
        task
    }
}
