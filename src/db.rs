use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use cohort_risk_analytics::{GradeEntry, StudentRecord};
use sqlx::{PgPool, Row};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SemesterSummary {
    pub semester: String,
    pub student_count: i64,
}

#[derive(Debug, Clone)]
struct RosterEntry {
    student_id: Uuid,
    full_name: String,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let semester = "2026-1";
    let students = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Avery Lee",
            "avery.lee@example.edu",
            vec![("Calculus", 91.0), ("Physics", 88.5), ("Chemistry", 94.0)],
            vec![],
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Jules Moreno",
            "jules.moreno@example.edu",
            vec![("Calculus", 62.0), ("Physics", 58.0), ("Chemistry", 71.0)],
            vec!["Part-time job", "Falta de motivación"],
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Kiara Patel",
            "kiara.patel@example.edu",
            vec![("Calculus", 48.0), ("Physics", 55.5), ("Chemistry", 52.0)],
            vec!["Problemas académicos", "Part-time job", "Salud mental"],
        ),
        (
            Uuid::parse_str("7b1e4c3a-5f60-4d2b-9a8e-1c2d3e4f5a6b")?,
            "Noor Haddad",
            "noor.haddad@example.edu",
            vec![("Calculus", 77.0), ("Physics", 81.0), ("Chemistry", 69.5)],
            vec!["Family issues"],
        ),
        (
            Uuid::parse_str("a9c8b7d6-e5f4-4a3b-8c2d-1e0f9a8b7c6d")?,
            "Mateo Ruiz",
            "mateo.ruiz@example.edu",
            vec![("Calculus", 35.0), ("Physics", 42.0), ("Chemistry", 40.5)],
            vec!["Situación económica", "Family issues", "Low study habits", "Transport"],
        ),
    ];
    let recorded_on = NaiveDate::from_ymd_opt(2026, 3, 16).context("invalid date")?;

    for (id, name, email, grades, factors) in students {
        let student_id = upsert_student(pool, id, name, email).await?;

        for (subject, value) in grades {
            insert_grade(pool, student_id, semester, subject, value, recorded_on).await?;
        }
        for label in factors {
            insert_risk_factor(pool, student_id, semester, label).await?;
        }
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        semester: String,
        subject: Option<String>,
        grade: Option<f64>,
        recorded_on: Option<NaiveDate>,
        risk_factor: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        let student_id = upsert_student(pool, Uuid::new_v4(), &row.full_name, &row.email).await?;

        if let (Some(subject), Some(grade)) = (row.subject.as_deref(), row.grade) {
            let recorded_on = row
                .recorded_on
                .unwrap_or_else(|| chrono::Utc::now().date_naive());
            inserted +=
                insert_grade(pool, student_id, &row.semester, subject, grade, recorded_on).await?;
        }

        if let Some(label) = row.risk_factor.as_deref().map(str::trim) {
            if !label.is_empty() {
                inserted += insert_risk_factor(pool, student_id, &row.semester, label).await?;
            }
        }
    }

    Ok(inserted)
}

pub async fn list_semesters(pool: &PgPool) -> anyhow::Result<Vec<SemesterSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT semester, COUNT(DISTINCT student_id) AS student_count
        FROM (
            SELECT semester, student_id FROM risk_analytics.grades
            UNION
            SELECT semester, student_id FROM risk_analytics.risk_factors
        ) enrolled
        GROUP BY semester
        ORDER BY semester DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| SemesterSummary {
            semester: row.get("semester"),
            student_count: row.get("student_count"),
        })
        .collect())
}

/// Loads every student active in `semester`.
///
/// Records are fetched in parallel, at most `concurrency` at a time. A student whose
/// lookup fails is logged and left out instead of failing the whole batch.
pub async fn fetch_student_records(
    pool: &PgPool,
    semester: &str,
    concurrency: usize,
) -> anyhow::Result<Vec<StudentRecord>> {
    let roster = fetch_roster(pool, semester).await?;
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks: JoinSet<FetchOutcome> = JoinSet::new();

    for (position, entry) in roster.into_iter().enumerate() {
        let pool = pool.clone();
        let permits = Arc::clone(&permits);
        let semester = semester.to_string();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let student_id = entry.student_id;
            let record = fetch_student_record(&pool, &semester, entry)
                .await
                .with_context(|| format!("failed to load records for student {student_id}"));
            anyhow::Ok((position, record))
        });
    }

    let records = collect_fetched(tasks).await;
    tracing::info!(semester, students = records.len(), "loaded student records");
    Ok(records)
}

type FetchOutcome = anyhow::Result<(usize, anyhow::Result<StudentRecord>)>;

/// Drains the fetch tasks in roster order, skipping students whose fetch failed or panicked.
async fn collect_fetched(mut tasks: JoinSet<FetchOutcome>) -> Vec<StudentRecord> {
    let mut records = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok((position, Ok(record)))) => records.push((position, record)),
            Ok(Ok((_, Err(err)))) => tracing::warn!("skipping student: {err:#}"),
            Ok(Err(err)) => tracing::warn!("skipping student: {err:#}"),
            Err(err) => tracing::warn!("skipping student, fetch task failed: {err}"),
        }
    }

    records.sort_by_key(|(position, _)| *position);
    records.into_iter().map(|(_, record)| record).collect()
}

async fn fetch_roster(pool: &PgPool, semester: &str) -> anyhow::Result<Vec<RosterEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT st.id, st.full_name
        FROM risk_analytics.students st
        WHERE EXISTS (
            SELECT 1 FROM risk_analytics.grades g
            WHERE g.student_id = st.id AND g.semester = $1
        ) OR EXISTS (
            SELECT 1 FROM risk_analytics.risk_factors f
            WHERE f.student_id = st.id AND f.semester = $1
        )
        ORDER BY st.full_name
        "#,
    )
    .bind(semester)
    .fetch_all(pool)
    .await
    .context("failed to load semester roster")?;

    Ok(rows
        .into_iter()
        .map(|row| RosterEntry {
            student_id: row.get("id"),
            full_name: row.get("full_name"),
        })
        .collect())
}

async fn fetch_student_record(
    pool: &PgPool,
    semester: &str,
    entry: RosterEntry,
) -> anyhow::Result<StudentRecord> {
    let grade_rows = sqlx::query(
        r#"
        SELECT subject, value, recorded_on
        FROM risk_analytics.grades
        WHERE student_id = $1 AND semester = $2
        ORDER BY recorded_on, subject
        "#,
    )
    .bind(entry.student_id)
    .bind(semester)
    .fetch_all(pool)
    .await?;

    let factor_rows = sqlx::query(
        r#"
        SELECT label
        FROM risk_analytics.risk_factors
        WHERE student_id = $1 AND semester = $2
        ORDER BY label
        "#,
    )
    .bind(entry.student_id)
    .bind(semester)
    .fetch_all(pool)
    .await?;

    let mut grades = Vec::with_capacity(grade_rows.len());
    for row in grade_rows {
        grades.push(GradeEntry {
            subject: row.get("subject"),
            value: row.get("value"),
            recorded_on: row.get("recorded_on"),
        });
    }

    Ok(StudentRecord {
        student_id: entry.student_id,
        full_name: entry.full_name,
        semester: semester.to_string(),
        grades,
        risk_factors: factor_rows.into_iter().map(|row| row.get("label")).collect(),
    })
}

async fn upsert_student(pool: &PgPool, id: Uuid, name: &str, email: &str) -> anyhow::Result<Uuid> {
    let student_id: Uuid = sqlx::query(
        r#"
        INSERT INTO risk_analytics.students (id, full_name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(student_id)
}

async fn insert_grade(
    pool: &PgPool,
    student_id: Uuid,
    semester: &str,
    subject: &str,
    value: f64,
    recorded_on: NaiveDate,
) -> anyhow::Result<usize> {
    let result = sqlx::query(
        r#"
        INSERT INTO risk_analytics.grades
        (id, student_id, semester, subject, value, recorded_on)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_id, semester, subject, recorded_on) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(semester)
    .bind(subject)
    .bind(value)
    .bind(recorded_on)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}

async fn insert_risk_factor(
    pool: &PgPool,
    student_id: Uuid,
    semester: &str,
    label: &str,
) -> anyhow::Result<usize> {
    let result = sqlx::query(
        r#"
        INSERT INTO risk_analytics.risk_factors (id, student_id, semester, label)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, semester, label) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(semester)
    .bind(label)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> StudentRecord {
        StudentRecord {
            student_id: Uuid::new_v4(),
            full_name: name.to_string(),
            semester: "2026-1".to_string(),
            grades: Vec::new(),
            risk_factors: Vec::new(),
        }
    }

    async fn panicking_fetch() -> FetchOutcome {
        panic!("row decode failed")
    }

    #[tokio::test]
    async fn failed_and_panicked_fetches_are_skipped() {
        let mut tasks: JoinSet<FetchOutcome> = JoinSet::new();
        tasks.spawn(async { anyhow::Ok((2, Ok(record("Kiara Patel")))) });
        tasks.spawn(async { anyhow::Ok((1, Err(anyhow::anyhow!("connection reset")))) });
        tasks.spawn(panicking_fetch());
        tasks.spawn(async { Err(anyhow::anyhow!("semaphore closed")) });
        tasks.spawn(async { anyhow::Ok((0, Ok(record("Avery Lee")))) });

        let records = collect_fetched(tasks).await;
        let names: Vec<_> = records.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["Avery Lee", "Kiara Patel"]);
    }
}
