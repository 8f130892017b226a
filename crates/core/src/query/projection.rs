//! Projection evaluation.

use serde_json::Map;

use crate::storage::{Document, Projection, RepositoryError, Result, ID_FIELD};

use super::path::{get_path, remove_path, set_path};

/// Applies `projection` to `document`.
///
/// Inclusion keeps the listed fields plus `_id` unless `_id` is explicitly
/// excluded. Exclusion removes the listed fields. Mixing both (other than
/// for `_id`) is rejected.
pub fn apply_projection(document: &Document, projection: &Projection) -> Result<Document> {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    let mut id_included = None;

    for (field, included) in projection.iter() {
        if field == ID_FIELD {
            id_included = Some(included);
        } else if included {
            includes.push(field);
        } else {
            excludes.push(field);
        }
    }

    if !includes.is_empty() && !excludes.is_empty() {
        return Err(RepositoryError::InvalidData(
            "projection cannot mix inclusion and exclusion".to_string(),
        ));
    }

    let inclusion = !includes.is_empty() || (excludes.is_empty() && id_included == Some(true));

    if inclusion {
        let mut result = Map::new();
        if id_included != Some(false) {
            if let Some(id) = document.get(ID_FIELD) {
                result.insert(ID_FIELD.to_string(), id.clone());
            }
        }
        for field in includes {
            if let Some(value) = get_path(document, field) {
                set_path(&mut result, field, value.clone());
            }
        }
        Ok(result)
    } else {
        let mut result = document.clone();
        for field in excludes {
            remove_path(&mut result, field);
        }
        if id_included == Some(false) {
            result.remove(ID_FIELD);
        }
        Ok(result)
    }
}
