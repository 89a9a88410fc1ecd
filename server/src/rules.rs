//! A small queue of one-shot "close the connection instead of replying"
//! rules, letting integration tests reproduce spec.md §8 scenario 4
//! ("server closes socket mid-`dir#list`") without racing real timing.

use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct Rules {
    queue: Mutex<Vec<(String, String)>>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next request matching `(controller, action)` gets no reply — the
    /// connection is dropped instead, simulating a mid-request disconnect.
    pub fn disconnect_next(&self, controller: &str, action: &str) {
        self.queue.lock().unwrap().push((controller.to_string(), action.to_string()));
    }

    /// Consume a matching rule if one is queued for `(controller, action)`.
    pub fn take_disconnect(&self, controller: &str, action: &str) -> bool {
        let mut queue = self.queue.lock().unwrap();
        if let Some(pos) = queue.iter().position(|(c, a)| c == controller && a == action) {
            queue.remove(pos);
            true
        } else {
            false
        }
    }
}
