mod ranker;

pub use ranker::*;
