#![allow(missing_docs)]

pub mod choice;
pub mod emit;
pub mod fields;
pub mod flatten;
pub mod generate;
pub mod schema;
pub mod spec;
pub mod state;
pub mod validate;

pub use choice::{
    BasisModule, Choice, Currency, EmployeeCountingMethod, IdentifierScheme, ReportingBasis,
    UnknownChoice, YesNo,
};
pub use emit::{ArtifactFormat, EmitError, render, render_json_schema, render_zod};
pub use fields::{
    EmailPairErrors, EntityNameField, FieldError, ReadinessIssue, check_email_pair,
    normalize_entity_name, parse_currency, parse_identifier_scheme, readiness_issues,
    validate_email, validate_entity_name, validate_number,
};
pub use flatten::{PayloadEntry, flatten};
pub use generate::{
    DatapointSchema, GenerateError, GenerateOptions, ModuleSchema, SchemaSet, UnknownTypeWarning,
    datapoint_schema, generate,
};
pub use schema::{Rule, Schema, SchemaIssue, SchemaKind};
pub use spec::{DataModel, DataType, DatapointSpec, ModuleSpec, ModuleTier};
pub use state::{
    EnvironmentalDisclosures, Field, FieldValue, GeneralInformation, GovernanceDisclosures,
    NumberInput, Section, SectionKind, SocialDisclosures, StateError, WizardState,
};
pub use validate::{ValidationError, ValidationResult, validate_module};
