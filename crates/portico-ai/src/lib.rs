mod answer;
mod http;
mod mock;

pub use answer::AnswerService;
pub use http::{AnswerServiceConfig, HttpAnswerClient};
pub use mock::MockAnswerClient;
