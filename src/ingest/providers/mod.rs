pub mod html;
pub mod sample;

pub use html::{extract_headlines, HtmlSource};
pub use sample::SampleSource;
