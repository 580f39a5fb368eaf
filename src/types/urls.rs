//! Canonical URLs of the SDC extensions and profiles that drive assembly.

/// Marks a placeholder item that stands in for a whole sub-questionnaire.
pub const SUB_QUESTIONNAIRE: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-subQuestionnaire";

/// Added to the assembled Questionnaire once per propagated sub-questionnaire.
pub const ASSEMBLED_FROM: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-assembledFrom";

pub const ASSEMBLE_EXPECTATION: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-assemble-expectation";

/// `valueCode` of an assemble-expectation extension that is stripped after assembly.
pub const ASSEMBLE_ROOT: &str = "assemble-root";

pub const CQF_LIBRARY: &str = "http://hl7.org/fhir/StructureDefinition/cqf-library";

pub const VARIABLE: &str = "http://hl7.org/fhir/StructureDefinition/variable";

pub const QUESTIONNAIRE_CONSTRAINT: &str =
    "http://hl7.org/fhir/StructureDefinition/questionnaire-constraint";

pub const LAUNCH_CONTEXT: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-launchContext";

pub const ITEM_POPULATION_CONTEXT: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-itemPopulationContext";

pub const ITEM_EXTRACTION_CONTEXT: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-itemExtractionContext";

/// Profile removed from `meta.profile` once a Questionnaire is no longer modular.
pub const MODULAR_PROFILE: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-modular";
