mod stub;

pub use stub::StubClassifier;
