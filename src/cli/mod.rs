pub mod annotate;
pub mod app;
pub mod check;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod runtime;

pub use annotate::{annotate, cmd_annotate, AnnotateArgs, AnnotateReport, ReviewRow};
pub use app::run;
pub use check::{cmd_check, cmd_ping, CheckArgs};
pub use config::{cmd_config, ConfigArgs};
