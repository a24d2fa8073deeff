use crate::domain_port::RepoError;
use sqlx::mysql::MySqlDatabaseError;

fn mysql_error_number(err: &sqlx::Error) -> Option<u16> {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return Some(mysql_err.number());
        }
    }

    None
}

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    mysql_error_number(err) == Some(1062) // ER_DUP_ENTRY
}

pub fn is_missing_fk(err: &sqlx::Error) -> bool {
    mysql_error_number(err) == Some(1452) // ER_NO_REFERENCED_ROW_2
}

pub fn store_err(err: sqlx::Error) -> RepoError {
    RepoError::Store(err.to_string())
}
