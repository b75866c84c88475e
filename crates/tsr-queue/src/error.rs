use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum QueueError {
	#[error("callback for command {0} failed: {1}")]
	CallbackFailed(uuid::Uuid, String),

	#[error("queue is disposed")]
	Disposed,
}
