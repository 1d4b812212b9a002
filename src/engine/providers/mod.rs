// ── Octoscout Engine: Model providers ──────────────────────────────────────
// Concrete ModelProvider implementations. Only Gemini is wired today; a new
// backend means one file here plus an impl of the trait in atoms/traits.rs.

pub mod google;

pub use google::GoogleProvider;
