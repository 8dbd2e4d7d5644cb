// Library root: the table model, grade math, archetype rules, table sources
// and the end-to-end refresh pipeline.

pub mod archetype;
pub mod grades;
pub mod pipeline;
pub mod scale;
pub mod source;
pub mod table;
