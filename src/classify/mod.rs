mod backend;
mod backends;
mod labels;

pub use backend::ClassifierBackend;
pub use backends::StubClassifier;
pub use labels::LabelTable;
