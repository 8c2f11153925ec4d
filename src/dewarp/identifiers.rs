//! Output file identifiers.
//!
//! Ids depend only on the input file id, the group names, the page's
//! position in the input set and the unit owner, so re-running over the same
//! input produces the same ids.

use crate::domain::UnitOwner;

/// Id of an output file derived from an input file id.
///
/// The input group name inside `input_id` is replaced by `output_grp`. When
/// that changes nothing the id falls back to `{output_grp}_{ordinal + 1:04}`.
pub fn output_file_id(input_id: &str, input_grp: &str, output_grp: &str, ordinal: usize) -> String {
    if !input_grp.is_empty() {
        let replaced = input_id.replace(input_grp, output_grp);
        if replaced != input_id {
            return replaced;
        }
    }
    padded(output_grp, ordinal)
}

/// Id of the image produced for one unit of a page.
///
/// Region images carry the region id so several regions of one page never
/// share an id.
pub fn unit_file_id(page_file_id: &str, owner: &UnitOwner) -> String {
    match owner.region_id() {
        None => page_file_id.to_string(),
        Some(region_id) => format!("{page_file_id}_{region_id}"),
    }
}

fn padded(base: &str, ordinal: usize) -> String {
    format!("{base}_{:04}", ordinal + 1)
}
