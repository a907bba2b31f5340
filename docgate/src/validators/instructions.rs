//! Semantic judgment instructions, one per stage

use crate::model::ValidationStage;

const STRUCTURE: &str = "You are a documentation structure reviewer.
Check that the document follows the expected layout: a single H1 title, \
'## Overview' with a '### Compatibility' subsection, setup instructions, \
troubleshooting and a '## Reference' section. Check that sections appear in a \
logical order and that headings describe their content.
Static checks already verified section presence and heading levels; focus on \
order, naming and whether each section holds what its heading promises.";

const ACCURACY: &str = "You are a documentation accuracy reviewer.
Compare the document against the package context. Flag product names, data \
stream names, field names, versions or behaviours that the context contradicts \
or does not support. Do not flag general statements that are plausibly true.";

const COMPLETENESS: &str = "You are a documentation completeness reviewer.
Check that a reader can go from nothing to working data using only this \
document: prerequisites, source-side configuration, onboarding steps, how to \
verify data arrives, troubleshooting and a field reference for every data \
stream in the package context. Missing setup instructions are critical.";

const QUALITY: &str = "You are a documentation quality reviewer.
Check clarity, concision and tone. Flag instructions that would lead a reader \
into an error, ambiguous steps, filler, and dismissive words such as 'simply' or \
'obviously'. Do not rewrite the document; report issues only.";

const PLACEHOLDERS: &str = "You are a documentation placeholder reviewer.
Missing information must be marked exactly as \
'<< INFORMATION NOT AVAILABLE - PLEASE UPDATE >>'. Flag informal placeholders \
([TBD], <INSERT ...>, ???), markers inside code blocks, and markers in the \
Overview or Setup sections where the information is essential.";

/// Default instruction for a stage. The urls stage is fully deterministic and
/// has none.
pub fn default_instruction(stage: ValidationStage) -> &'static str {
    match stage {
        ValidationStage::Structure => STRUCTURE,
        ValidationStage::Accuracy => ACCURACY,
        ValidationStage::Completeness => COMPLETENESS,
        ValidationStage::Urls => "",
        ValidationStage::Quality => QUALITY,
        ValidationStage::Placeholders => PLACEHOLDERS,
    }
}
