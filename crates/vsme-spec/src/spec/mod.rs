pub mod datapoint;
pub mod model;

pub use datapoint::{DataType, DatapointSpec, SelectOption, ValidationSpec};
pub use model::{CoreReport, DataModel, DisclosureSpec, ModuleSpec, ModuleTier};
