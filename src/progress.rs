//! Текстовое отображение прогресса дампа.

use crate::dump::ProgressNotification;

/// Строка прогресса для терминала.
///
/// `previous`: база из предыдущего уведомления. При смене базы строка
/// начинается с перевода строки, чтобы итог прошлой базы остался на
/// экране; уведомления с нулём ключей ничего не выводят.
pub fn render(
    previous: Option<u32>,
    note: &ProgressNotification,
) -> String {
    let mut out = String::new();
    if previous.is_some_and(|db| db != note.db) {
        out.push('\n');
    }
    if note.done > 0 {
        out.push_str(&format!("\rDatabase {}: {} element dumped", note.db, note.done));
    }
    out
}
