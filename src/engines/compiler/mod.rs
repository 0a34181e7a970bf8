pub mod builder;
pub mod template;

pub use builder::compile;
pub use template::{LabMetadata, NodeType, Position, TemplateConnection, TemplateNode, WizardTemplate};
