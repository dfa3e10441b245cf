pub mod criteria;
pub mod history;
pub mod lenient;
pub mod profile;

pub use criteria::{Criteria, CriteriaUpdate, IndustryCriteria, RequirementCriteria};
pub use history::{BusinessMetrics, HistoricalCustomerRecord};
pub use profile::{
    CustomerProfile, IndustryCategory, Requirements, ScoreBreakdown, SectionTitle, Services,
    SimilarCustomer, SimilarCustomerSection, UserCount,
};
