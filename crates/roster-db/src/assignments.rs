use std::collections::HashMap;

use rusqlite::OptionalExtension;

use roster_types::Assignment;

use crate::error::is_foreign_key_violation;
use crate::models::{ASSIGNMENT_COLUMNS, NewAssignment, assignment};
use crate::{Database, DbError, Result};

impl Database {
    /// Record an uploaded artifact. Callers must have checked ownership of
    /// the target classroom first; the store only guarantees it exists.
    pub fn create_assignment(&self, new: &NewAssignment) -> Result<Assignment> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO assignments (filename, classroom_id, artifact_key, size, sha256)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING {}",
                ASSIGNMENT_COLUMNS
            );
            conn.query_row(
                &sql,
                rusqlite::params![
                    new.filename,
                    new.classroom_id,
                    new.artifact_key,
                    new.size,
                    new.sha256
                ],
                assignment,
            )
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DbError::NotFound("classroom")
                } else {
                    e.into()
                }
            })
        })
    }

    pub fn get_assignment(&self, id: i64) -> Result<Option<Assignment>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM assignments WHERE id = ?1", ASSIGNMENT_COLUMNS);
            Ok(conn.query_row(&sql, [id], assignment).optional()?)
        })
    }

    pub fn list_assignments(&self, classroom_id: i64) -> Result<Vec<Assignment>> {
        self.list_assignments_for_classrooms(&[classroom_id])
    }

    /// Batch-fetch assignments for a set of classrooms. Results follow the
    /// order classrooms appear in `classroom_ids`, then upload order.
    pub fn list_assignments_for_classrooms(&self, classroom_ids: &[i64]) -> Result<Vec<Assignment>> {
        let mut position: HashMap<i64, usize> = HashMap::new();
        for &id in classroom_ids {
            let next = position.len();
            position.entry(id).or_insert(next);
        }
        if position.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<i64> = position.keys().copied().collect();
        let mut rows = self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {} FROM assignments WHERE classroom_id IN ({})",
                ASSIGNMENT_COLUMNS,
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(ids.iter()), assignment)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        rows.sort_by_key(|a| (position.get(&a.classroom_id).copied().unwrap_or(usize::MAX), a.id));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use roster_types::Role;

    use super::*;

    fn upload(db: &Database, classroom_id: i64, filename: &str) -> Assignment {
        db.create_assignment(&NewAssignment {
            classroom_id,
            filename: filename.to_string(),
            artifact_key: uuid::Uuid::new_v4().to_string(),
            size: 4,
            sha256: "00".repeat(32),
        })
        .unwrap()
    }

    #[test]
    fn assignments_are_scoped_to_classrooms() {
        let db = Database::open_in_memory().unwrap();
        let teacher = db.create_user("t", "h", Role::Teacher).unwrap();
        let algebra = db.create_classroom(teacher.id, "Algebra").unwrap();
        let biology = db.create_classroom(teacher.id, "Biology").unwrap();

        let hw1 = upload(&db, algebra.id, "hw1.pdf");
        let lab = upload(&db, biology.id, "lab.pdf");
        let hw2 = upload(&db, algebra.id, "hw2.pdf");

        assert_eq!(db.list_assignments(algebra.id).unwrap(), vec![hw1.clone(), hw2.clone()]);
        assert_eq!(
            db.list_assignments_for_classrooms(&[biology.id, algebra.id]).unwrap(),
            vec![lab.clone(), hw1.clone(), hw2.clone()]
        );
        assert_eq!(
            db.list_assignments_for_classrooms(&[algebra.id, biology.id, algebra.id])
                .unwrap()
                .len(),
            3
        );
        assert!(db.list_assignments_for_classrooms(&[]).unwrap().is_empty());
        assert_eq!(db.get_assignment(lab.id).unwrap(), Some(lab));
    }

    #[test]
    fn assignment_for_missing_classroom_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .create_assignment(&NewAssignment {
                classroom_id: 999,
                filename: "hw1.pdf".into(),
                artifact_key: "k".into(),
                size: 1,
                sha256: "ab".into(),
            })
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound("classroom")));
    }
}
