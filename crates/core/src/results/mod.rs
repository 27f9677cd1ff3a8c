//! # Result Rendering
//!
//! Fetches the results contract for a destination and drives the page
//! through idle → analyzing → live / not_found / error.

pub mod contract;
pub mod fetcher;
pub mod page;
pub mod sections;

pub use contract::{
    parse_payload, Contract, FitTier, InvestorIdentity, LeverageAction, Orientation, SignalRow,
    TeaserCounts, TOP_MATCH_LIMIT,
};
pub use fetcher::{FetchTarget, InMemoryFetcher, PayloadFetcher};
pub use page::{PageStatus, ResultPage, ResultPageState, SubmitRejected, Submission};
pub use sections::{render_sections, Section, SectionKind, SECTION_ORDER};
