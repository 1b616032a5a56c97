/// One progress update surfaced to the caller of a batch stage (spec §4.5
/// "Progress is reported via a callback with stage name, percentage, and
/// free-text message").
#[derive(Debug, Clone)]
pub struct Progress {
    pub stage: String,
    pub percent: f32,
    pub message: String,
}

pub type ProgressCallback<'a> = &'a (dyn Fn(Progress) + Send + Sync);

pub(crate) fn report(callback: Option<ProgressCallback<'_>>, stage: &str, percent: f32, message: impl Into<String>) {
    if let Some(cb) = callback {
        cb(Progress {
            stage: stage.to_string(),
            percent,
            message: message.into(),
        });
    }
}
