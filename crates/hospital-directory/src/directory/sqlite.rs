use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use tracing::{debug, info};

use super::domain::{
    DirectoryFilter, Hospital, HospitalDetails, HospitalId, Professional, ProfessionalDetails,
    ProfessionalId, ProfessionalStatus, UnknownStatus,
};
use super::repository::{DirectoryStore, EmailUniqueness, StoreError};

const MIGRATIONS: [(i64, &str); 1] = [(1, include_str!("../../migrations/001_directory.sql"))];

const HOSPITAL_COLUMNS: &str = "id, name, state, city, address, phone, email, website, \
     description, services, banner_image, medical_director_name, medical_director_bio, \
     medical_director_photo, created_at";

const PROFESSIONAL_COLUMNS: &str = "id, name, role, hospital_id, designation, specialization, \
     bio, email, phone, profile_photo, status, created_at, updated_at";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed store. A single connection is shared behind a mutex; writes that check
/// invariants run inside immediate transactions so other processes cannot interleave.
#[derive(Debug)]
pub struct SqliteDirectoryStore {
    conn: Mutex<Option<Connection>>,
}

impl SqliteDirectoryStore {
    /// Open (or create) the database file and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(unavailable)?;
        let store = Self::initialize(conn, busy_timeout)?;
        info!(path = %path.display(), "sqlite directory store opened");
        Ok(store)
    }

    /// Private in-memory database, mostly for tests and throwaway demos.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::initialize(conn, DEFAULT_BUSY_TIMEOUT)
    }

    fn initialize(mut conn: Connection, busy_timeout: Duration) -> Result<Self, StoreError> {
        conn.busy_timeout(busy_timeout).map_err(unavailable)?;
        let journal_mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(unavailable)?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(unavailable)?;
        register_fold_case(&conn)?;
        debug!(%journal_mode, "sqlite pragmas applied");
        run_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        self.with_connection(|conn| current_version(conn))
    }

    /// Release the connection. Later calls fail with [`StoreError::Unavailable`].
    pub fn close(&self) -> Result<(), StoreError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection mutex poisoned".to_string()))?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, err)| unavailable(err))?;
            info!("sqlite directory store closed");
        }
        Ok(())
    }

    fn with_connection<T>(
        &self,
        operation: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection mutex poisoned".to_string()))?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("sqlite store is closed".to_string()))?;
        operation(conn)
    }
}

impl DirectoryStore for SqliteDirectoryStore {
    fn insert_hospital(
        &self,
        details: HospitalDetails,
        created_at: DateTime<Utc>,
    ) -> Result<Hospital, StoreError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO hospitals (name, state, city, address, phone, email, website,
                 description, services, banner_image, medical_director_name,
                 medical_director_bio, medical_director_photo, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    details.name,
                    details.state,
                    details.city,
                    details.address,
                    details.phone,
                    details.email,
                    details.website,
                    details.description,
                    details.services,
                    details.banner_image,
                    details.medical_director_name,
                    details.medical_director_bio,
                    details.medical_director_photo,
                    created_at,
                ],
            )
            .map_err(unavailable)?;

            Ok(Hospital {
                id: HospitalId(conn.last_insert_rowid()),
                details,
                created_at,
            })
        })
    }

    fn fetch_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, StoreError> {
        self.with_connection(|conn| select_hospital(conn, id))
    }

    fn list_hospitals(&self, limit: Option<usize>) -> Result<Vec<Hospital>, StoreError> {
        // LIMIT -1 means unbounded in SQLite.
        let limit = limit.map_or(-1, |value| i64::try_from(value).unwrap_or(i64::MAX));
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {HOSPITAL_COLUMNS} FROM hospitals ORDER BY id LIMIT ?1"
                ))
                .map_err(unavailable)?;
            let rows = stmt
                .query_map(params![limit], hospital_from_row)
                .map_err(unavailable)?;
            let hospitals = rows.collect::<Result<Vec<_>, _>>().map_err(unavailable)?;
            Ok(hospitals)
        })
    }

    fn count_hospitals(&self) -> Result<usize, StoreError> {
        self.with_connection(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM hospitals", [], |row| row.get(0))
                .map_err(unavailable)?;
            usize::try_from(count)
                .map_err(|_| StoreError::Corrupt(format!("negative hospital count {count}")))
        })
    }

    fn delete_hospital(&self, id: HospitalId) -> Result<Option<Hospital>, StoreError> {
        self.with_connection(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(unavailable)?;

            let Some(hospital) = select_hospital(&tx, id)? else {
                return Ok(None);
            };

            let referenced: i64 = tx
                .query_row(
                    "SELECT COUNT(*) FROM professionals WHERE hospital_id = ?1",
                    params![id.0],
                    |row| row.get(0),
                )
                .map_err(unavailable)?;
            if referenced > 0 {
                return Err(StoreError::HospitalInUse(id));
            }

            tx.execute("DELETE FROM hospitals WHERE id = ?1", params![id.0])
                .map_err(unavailable)?;
            tx.commit().map_err(unavailable)?;
            Ok(Some(hospital))
        })
    }

    fn insert_professional(
        &self,
        details: ProfessionalDetails,
        email: EmailUniqueness,
        created_at: DateTime<Utc>,
    ) -> Result<Professional, StoreError> {
        self.with_connection(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(unavailable)?;

            if select_hospital(&tx, details.hospital_id)?.is_none() {
                return Err(StoreError::UnknownHospital(details.hospital_id));
            }

            if email.is_enforced() {
                if let Some(address) = details.email.as_deref() {
                    let holder: Option<String> = tx
                        .query_row(
                            "SELECT status FROM professionals
                             WHERE lower(email) = lower(?1) AND status IN ('pending', 'approved')
                             ORDER BY id LIMIT 1",
                            params![address],
                            |row| row.get(0),
                        )
                        .optional()
                        .map_err(unavailable)?;
                    if let Some(status) = holder {
                        return Err(StoreError::DuplicateEmail {
                            email: address.to_string(),
                            status: parse_status(&status)?,
                        });
                    }
                }
            }

            let status = ProfessionalStatus::Pending;
            tx.execute(
                "INSERT INTO professionals (name, role, hospital_id, designation, specialization,
                 bio, email, phone, profile_photo, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    details.name,
                    details.role,
                    details.hospital_id.0,
                    details.designation,
                    details.specialization,
                    details.bio,
                    details.email,
                    details.phone,
                    details.profile_photo,
                    status.label(),
                    created_at,
                    created_at,
                ],
            )
            .map_err(unavailable)?;
            let id = ProfessionalId(tx.last_insert_rowid());
            tx.commit().map_err(unavailable)?;

            Ok(Professional {
                id,
                details,
                status,
                created_at,
                updated_at: created_at,
            })
        })
    }

    fn fetch_professional(&self, id: ProfessionalId) -> Result<Option<Professional>, StoreError> {
        self.with_connection(|conn| select_professional(conn, id))
    }

    fn list_professionals(
        &self,
        status: ProfessionalStatus,
        filter: &DirectoryFilter,
    ) -> Result<Vec<Professional>, StoreError> {
        let mut sql = format!("SELECT {PROFESSIONAL_COLUMNS} FROM professionals WHERE status = ?1");
        let mut values = vec![Value::Text(status.label().to_string())];

        if let Some(hospital_id) = filter.hospital_id {
            values.push(Value::Integer(hospital_id.0));
            sql.push_str(&format!(" AND hospital_id = ?{}", values.len()));
        }
        if let Some(role) = filter.role_exact() {
            values.push(Value::Text(role.to_string()));
            sql.push_str(&format!(" AND role = ?{}", values.len()));
        }
        if let Some(needle) = filter.specialization_needle() {
            values.push(Value::Text(needle));
            sql.push_str(&format!(
                " AND instr(fold_case(specialization), ?{}) > 0",
                values.len()
            ));
        }
        sql.push_str(" ORDER BY id");
        debug!(%sql, "listing professionals");

        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(unavailable)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), professional_row)
                .map_err(unavailable)?;
            let rows = rows.collect::<Result<Vec<_>, _>>().map_err(unavailable)?;
            rows.into_iter()
                .map(ProfessionalRow::into_professional)
                .collect()
        })
    }

    fn compare_and_set_status(
        &self,
        id: ProfessionalId,
        expected: ProfessionalStatus,
        next: ProfessionalStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Professional>, StoreError> {
        self.with_connection(|conn| {
            let changed = conn
                .execute(
                    "UPDATE professionals SET status = ?1, updated_at = ?2
                     WHERE id = ?3 AND status = ?4",
                    params![next.label(), updated_at, id.0, expected.label()],
                )
                .map_err(unavailable)?;
            if changed == 0 {
                return Ok(None);
            }
            select_professional(conn, id)
        })
    }

    fn delete_professional(&self, id: ProfessionalId) -> Result<Option<Professional>, StoreError> {
        self.with_connection(|conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(unavailable)?;
            let Some(professional) = select_professional(&tx, id)? else {
                return Ok(None);
            };
            tx.execute("DELETE FROM professionals WHERE id = ?1", params![id.0])
                .map_err(unavailable)?;
            tx.commit().map_err(unavailable)?;
            Ok(Some(professional))
        })
    }
}

/// Unicode lowercase for filter matching. SQLite's built-in `lower` only folds ASCII.
fn register_fold_case(conn: &Connection) -> Result<(), StoreError> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|value| value.to_lowercase()))
        },
    )
    .map_err(unavailable)
}

fn run_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at TEXT NOT NULL
         );",
    )
    .map_err(unavailable)?;

    let current = current_version(conn)?;
    for (version, sql) in MIGRATIONS {
        if version <= current {
            continue;
        }
        info!(version, "applying directory schema migration");
        let tx = conn.transaction().map_err(unavailable)?;
        tx.execute_batch(sql).map_err(|err| {
            StoreError::Unavailable(format!("schema migration {version} failed: {err}"))
        })?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            params![version, Utc::now()],
        )
        .map_err(unavailable)?;
        tx.commit().map_err(unavailable)?;
    }
    Ok(())
}

fn current_version(conn: &Connection) -> Result<i64, StoreError> {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .map(|version| version.unwrap_or(0))
    .map_err(unavailable)
}

fn select_hospital(conn: &Connection, id: HospitalId) -> Result<Option<Hospital>, StoreError> {
    conn.query_row(
        &format!("SELECT {HOSPITAL_COLUMNS} FROM hospitals WHERE id = ?1"),
        params![id.0],
        hospital_from_row,
    )
    .optional()
    .map_err(unavailable)
}

fn select_professional(
    conn: &Connection,
    id: ProfessionalId,
) -> Result<Option<Professional>, StoreError> {
    conn.query_row(
        &format!("SELECT {PROFESSIONAL_COLUMNS} FROM professionals WHERE id = ?1"),
        params![id.0],
        professional_row,
    )
    .optional()
    .map_err(unavailable)?
    .map(ProfessionalRow::into_professional)
    .transpose()
}

fn hospital_from_row(row: &Row<'_>) -> rusqlite::Result<Hospital> {
    Ok(Hospital {
        id: HospitalId(row.get(0)?),
        details: HospitalDetails {
            name: row.get(1)?,
            state: row.get(2)?,
            city: row.get(3)?,
            address: row.get(4)?,
            phone: row.get(5)?,
            email: row.get(6)?,
            website: row.get(7)?,
            description: row.get(8)?,
            services: row.get(9)?,
            banner_image: row.get(10)?,
            medical_director_name: row.get(11)?,
            medical_director_bio: row.get(12)?,
            medical_director_photo: row.get(13)?,
        },
        created_at: row.get(14)?,
    })
}

/// Raw professional row; the status column is parsed after the row leaves rusqlite.
struct ProfessionalRow {
    id: i64,
    details: ProfessionalDetails,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfessionalRow {
    fn into_professional(self) -> Result<Professional, StoreError> {
        Ok(Professional {
            id: ProfessionalId(self.id),
            details: self.details,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn professional_row(row: &Row<'_>) -> rusqlite::Result<ProfessionalRow> {
    Ok(ProfessionalRow {
        id: row.get(0)?,
        details: ProfessionalDetails {
            name: row.get(1)?,
            role: row.get(2)?,
            hospital_id: HospitalId(row.get(3)?),
            designation: row.get(4)?,
            specialization: row.get(5)?,
            bio: row.get(6)?,
            email: row.get(7)?,
            phone: row.get(8)?,
            profile_photo: row.get(9)?,
        },
        status: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn parse_status(raw: &str) -> Result<ProfessionalStatus, StoreError> {
    raw.parse()
        .map_err(|err: UnknownStatus| StoreError::Corrupt(err.to_string()))
}

fn unavailable(err: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}
