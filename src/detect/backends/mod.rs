mod motion;
mod scripted;

pub use motion::MotionBackend;
pub use scripted::ScriptedBackend;
