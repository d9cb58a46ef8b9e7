//! Helpers for batching SQLite statements.

/// SQLite's default bound-parameter limit (`SQLITE_MAX_VARIABLE_NUMBER`).
pub const SQLITE_MAX_PARAMS: usize = 999;

/// Split rows into slices that keep a multi-row `INSERT` under the
/// parameter limit, given `columns` bound values per row.
pub fn chunk_rows<T>(rows: &[T], columns: usize) -> impl Iterator<Item = &[T]> {
    let per_chunk = (SQLITE_MAX_PARAMS / columns.max(1)).max(1);
    rows.chunks(per_chunk)
}
