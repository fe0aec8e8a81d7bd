//! Pure tax calculations.
//!
//! Every calculator in this module is stateless apart from the parameters it
//! is constructed with; none of them touch the ledger or the clock directly.

pub mod assessment;
pub mod common;
pub mod depreciation;
pub mod euer;
pub mod income_tax;
pub mod projection;
pub mod solidarity;
pub mod tax_reserve;
pub mod trade_tax;
pub mod vat;

pub use assessment::{AssessmentCalculator, AssessmentInput, DeductionBreakdown, TaxAssessment};
pub use depreciation::{
    AllocatedAsset, DepreciationCalculator, DepreciationYearEntry, ExpenseTreatment, GwgPolicy,
    StreamDepreciation, compute_depreciation_for_year, compute_schedule, stream_totals_for_year,
};
pub use euer::{DualEuer, EuerError, EuerStatement};
pub use income_tax::{BracketTaxCalculator, IncomeTaxError, compute_tax};
pub use projection::{AnnualProjector, Projection, ProjectionError, days_in_year};
pub use solidarity::{SurchargeCalculator, compute_surcharge};
pub use tax_reserve::{TaxReserve, TaxReserveCalculator, TaxReserveConfig, TaxReserveError};
pub use trade_tax::{TradeTaxCalculator, TradeTaxConfig, TradeTaxError, TradeTaxResult};
pub use vat::{
    REDUCED_RATE, STANDARD_RATE, VatConverter, VatError, extract_vat, gross_from_net,
    net_from_gross,
};
