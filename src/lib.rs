//! # OctoFHIR SDC Assemble
//!
//! An async implementation of the FHIR SDC `$assemble` operation: a modular
//! Questionnaire whose form items reference sub-questionnaires by canonical
//! url is resolved into one self-contained Questionnaire.
//!
//! ## Features
//!
//! - **Recursive assembly**: nested sub-questionnaires resolve depth-first,
//!   with cycle detection across the whole call
//! - **Concurrent fetching**: all references of one level are fetched at once
//!   through a pluggable [`QuestionnaireFetcher`]
//! - **Safe merging**: duplicate linkIds are renamed and `enableWhen`
//!   references follow them; contained resources and SDC extensions are
//!   propagated to the assembled Questionnaire
//! - **Lossless model**: elements the assembler does not interpret are kept
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use octofhir_sdc_assemble::*;
//! use serde_json::{Value, json};
//!
//! # async fn example() -> Result<()> {
//! let fetcher = |url: String, _config: Option<Value>| async move {
//!     // Look the canonical up on a forms server here.
//!     Ok::<_, FetchError>(json!({ "resourceType": "Bundle", "type": "searchset" }))
//! };
//!
//! let parameters: Parameters = serde_json::from_str("{}")?;
//! let input = InputParameters::from_parameters(parameters)?;
//! match assemble(input, &fetcher, None).await {
//!     AssembleOutput::Questionnaire(questionnaire) => println!("assembled {questionnaire}"),
//!     AssembleOutput::Parameters(result) => println!("assembled with {} warnings", result.outcome.issue.len()),
//!     AssembleOutput::OperationOutcome(outcome) => println!("failed: {}", outcome.issue[0]),
//! }
//! # Ok(())
//! # }
//! ```

pub mod assemble;
pub mod core;
pub mod error;
pub mod fetch;
pub mod types;

pub use assemble::{QuestionnaireAssembler, assemble, assemble_with_config};
pub use crate::core::{AssembleConfig, MissingVersionPolicy};
pub use error::Result;
pub use error::{AssembleError, FetchError, ProhibitedAttribute};
pub use fetch::{FetchedBatch, MemoryQuestionnaireSource, QuestionnaireFetcher, fetch_subquestionnaires};
pub use types::*;
