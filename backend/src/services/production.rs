//! Production stage tracking for print jobs
//!
//! A job is the ordered list of stages attached to one invoice, copied from
//! the company's active stage templates. Transitions follow
//! [`StageStatus::apply`]; a stage can only start once every earlier stage
//! is completed or skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    can_start_after, parse_status, progress_percent, InvoiceStatus, ProductionStage, StageAction,
    StageStatus, StageTemplate,
};

#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct TemplateRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    sort_order: i32,
    requires_approval: bool,
    is_active: bool,
}

impl From<TemplateRow> for StageTemplate {
    fn from(row: TemplateRow) -> Self {
        StageTemplate {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            sort_order: row.sort_order,
            requires_approval: row.requires_approval,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StageRow {
    id: Uuid,
    company_id: Uuid,
    invoice_id: Uuid,
    name: String,
    sort_order: i32,
    requires_approval: bool,
    status: String,
    held_from: Option<String>,
    notes: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    updated_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StageRow> for ProductionStage {
    type Error = AppError;

    fn try_from(row: StageRow) -> AppResult<Self> {
        let held_from = row
            .held_from
            .as_deref()
            .map(|s| parse_status("production_stages.held_from", s, StageStatus::from_str))
            .transpose()?;

        Ok(ProductionStage {
            status: parse_status("production_stages.status", &row.status, StageStatus::from_str)?,
            held_from,
            id: row.id,
            company_id: row.company_id,
            invoice_id: row.invoice_id,
            name: row.name,
            sort_order: row.sort_order,
            requires_approval: row.requires_approval,
            notes: row.notes,
            started_at: row.started_at,
            completed_at: row.completed_at,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// All stages of one job with its progress
#[derive(Debug, Serialize)]
pub struct ProductionJob {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub progress_percent: u8,
    pub stages: Vec<ProductionStage>,
}

/// One line of the job board
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct JobSummary {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub customer_name: String,
    pub total_stages: i64,
    pub done_stages: i64,
    pub current_stage: Option<String>,
    pub awaiting_approval: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplateInput {
    #[validate(length(min = 1, max = 100, message = "Stage name is required"))]
    pub name: String,
    pub sort_order: i32,
    #[serde(default)]
    pub requires_approval: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTemplateInput {
    #[validate(length(min = 1, max = 100, message = "Stage name is required"))]
    pub name: Option<String>,
    pub sort_order: Option<i32>,
    pub requires_approval: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StageActionInput {
    pub action: StageAction,
    #[validate(length(max = 1000, message = "Notes are too long"))]
    pub notes: Option<String>,
}

/// The stage after `action`, with hold bookkeeping and timestamps updated
fn transition(
    stage: &ProductionStage,
    earlier: &[StageStatus],
    action: StageAction,
    now: DateTime<Utc>,
) -> AppResult<ProductionStage> {
    if action == StageAction::Start && !can_start_after(earlier) {
        return Err(AppError::InvalidStateTransition(format!(
            "cannot start stage {} before earlier stages are completed or skipped",
            stage.name
        )));
    }

    let next = stage
        .status
        .apply(action, stage.requires_approval, stage.held_from)?;

    let held_from = match action {
        StageAction::Hold => Some(stage.status),
        StageAction::Resume => None,
        _ => stage.held_from,
    };

    Ok(ProductionStage {
        status: next,
        held_from,
        started_at: match next {
            StageStatus::InProgress => stage.started_at.or(Some(now)),
            _ => stage.started_at,
        },
        completed_at: if next.is_done() { Some(now) } else { None },
        updated_at: now,
        ..stage.clone()
    })
}

const STAGE_COLUMNS: &str = "id, company_id, invoice_id, name, sort_order, requires_approval, \
     status, held_from, notes, started_at, completed_at, updated_by, created_at, updated_at";

impl ProductionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_templates(&self, company_id: Uuid) -> AppResult<Vec<StageTemplate>> {
        let rows = sqlx::query_as::<_, TemplateRow>(
            r#"
            SELECT id, company_id, name, sort_order, requires_approval, is_active
            FROM production_stage_templates
            WHERE company_id = $1
            ORDER BY sort_order ASC, name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(StageTemplate::from).collect())
    }

    pub async fn create_template(
        &self,
        company_id: Uuid,
        input: CreateTemplateInput,
    ) -> AppResult<StageTemplate> {
        input.validate()?;

        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            INSERT INTO production_stage_templates (company_id, name, sort_order, requires_approval)
            VALUES ($1, $2, $3, $4)
            RETURNING id, company_id, name, sort_order, requires_approval, is_active
            "#,
        )
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.sort_order)
        .bind(input.requires_approval)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Changes apply to jobs created afterwards; existing stages keep their copy
    pub async fn update_template(
        &self,
        company_id: Uuid,
        template_id: Uuid,
        input: UpdateTemplateInput,
    ) -> AppResult<StageTemplate> {
        input.validate()?;

        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            UPDATE production_stage_templates
            SET name = COALESCE($1, name),
                sort_order = COALESCE($2, sort_order),
                requires_approval = COALESCE($3, requires_approval),
                is_active = COALESCE($4, is_active)
            WHERE id = $5 AND company_id = $6
            RETURNING id, company_id, name, sort_order, requires_approval, is_active
            "#,
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.sort_order)
        .bind(input.requires_approval)
        .bind(input.is_active)
        .bind(template_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stage template".to_string()))?;

        Ok(row.into())
    }

    /// Instantiate the company's active templates as pending stages of a job
    pub async fn create_job(&self, company_id: Uuid, invoice_id: Uuid) -> AppResult<ProductionJob> {
        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM invoices WHERE id = $1 AND company_id = $2",
        )
        .bind(invoice_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        if parse_status("invoices.status", &status, InvoiceStatus::from_str)?
            == InvoiceStatus::Cancelled
        {
            return Err(AppError::InvalidStateTransition(
                "cannot start production for a cancelled invoice".into(),
            ));
        }

        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM production_stages WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await?;

        if existing > 0 {
            return Err(AppError::conflict("production", "Production has already been started for this invoice"));
        }

        let created = sqlx::query(
            r#"
            INSERT INTO production_stages (company_id, invoice_id, template_id, name, sort_order, requires_approval)
            SELECT company_id, $2, id, name, sort_order, requires_approval
            FROM production_stage_templates
            WHERE company_id = $1 AND is_active = true
            "#,
        )
        .bind(company_id)
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

        if created.rows_affected() == 0 {
            return Err(AppError::validation(
                "templates",
                "No active production stage templates are configured",
            ));
        }

        tx.commit().await?;

        tracing::info!(%company_id, %invoice_id, stages = created.rows_affected(), "Production job created");

        self.get_job(company_id, invoice_id).await
    }

    pub async fn get_job(&self, company_id: Uuid, invoice_id: Uuid) -> AppResult<ProductionJob> {
        let invoice_number = sqlx::query_scalar::<_, String>(
            "SELECT invoice_number FROM invoices WHERE id = $1 AND company_id = $2",
        )
        .bind(invoice_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let stages = sqlx::query_as::<_, StageRow>(&format!(
            "SELECT {STAGE_COLUMNS} FROM production_stages \
             WHERE invoice_id = $1 AND company_id = $2 ORDER BY sort_order ASC, created_at ASC"
        ))
        .bind(invoice_id)
        .bind(company_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(ProductionStage::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        let statuses: Vec<StageStatus> = stages.iter().map(|s| s.status).collect();

        Ok(ProductionJob {
            invoice_id,
            invoice_number,
            progress_percent: progress_percent(&statuses),
            stages,
        })
    }

    /// Jobs with at least one stage that is not done yet
    pub async fn list_open_jobs(&self, company_id: Uuid) -> AppResult<Vec<JobSummary>> {
        let jobs = sqlx::query_as::<_, JobSummary>(
            r#"
            SELECT i.id AS invoice_id, i.invoice_number, c.name AS customer_name,
                   COUNT(s.id) AS total_stages,
                   COUNT(s.id) FILTER (WHERE s.status IN ('completed', 'skipped')) AS done_stages,
                   (ARRAY_AGG(s.name ORDER BY s.sort_order)
                        FILTER (WHERE s.status NOT IN ('completed', 'skipped')))[1] AS current_stage,
                   BOOL_OR(s.status = 'requires_approval') AS awaiting_approval
            FROM production_stages s
            JOIN invoices i ON i.id = s.invoice_id
            JOIN customers c ON c.id = i.customer_id
            WHERE s.company_id = $1
            GROUP BY i.id, i.invoice_number, c.name
            HAVING COUNT(s.id) FILTER (WHERE s.status NOT IN ('completed', 'skipped')) > 0
            ORDER BY i.invoice_number ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(jobs)
    }

    /// Apply a user action to one stage. The caller has already checked the
    /// permission named by [`StageAction::required_permission`].
    pub async fn apply_action(
        &self,
        company_id: Uuid,
        stage_id: Uuid,
        user_id: Uuid,
        input: StageActionInput,
    ) -> AppResult<ProductionStage> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let invoice_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT invoice_id FROM production_stages WHERE id = $1 AND company_id = $2",
        )
        .bind(stage_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Production stage".to_string()))?;

        // Lock the whole job so the ordering check sees a stable picture
        let stages = sqlx::query_as::<_, StageRow>(&format!(
            "SELECT {STAGE_COLUMNS} FROM production_stages \
             WHERE invoice_id = $1 ORDER BY sort_order ASC, created_at ASC FOR UPDATE"
        ))
        .bind(invoice_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(ProductionStage::try_from)
        .collect::<AppResult<Vec<_>>>()?;

        let position = stages
            .iter()
            .position(|s| s.id == stage_id)
            .ok_or_else(|| AppError::NotFound("Production stage".to_string()))?;
        let earlier: Vec<StageStatus> = stages[..position].iter().map(|s| s.status).collect();

        let updated = transition(&stages[position], &earlier, input.action, Utc::now())?;

        let row = sqlx::query_as::<_, StageRow>(&format!(
            "UPDATE production_stages SET status = $1, held_from = $2, notes = COALESCE($3, notes), \
             started_at = $4, completed_at = $5, updated_by = $6, updated_at = NOW() \
             WHERE id = $7 RETURNING {STAGE_COLUMNS}"
        ))
        .bind(updated.status.as_str())
        .bind(updated.held_from.map(|s| s.as_str()))
        .bind(&input.notes)
        .bind(updated.started_at)
        .bind(updated.completed_at)
        .bind(user_id)
        .bind(stage_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            %stage_id,
            %invoice_id,
            action = %input.action,
            from = %stages[position].status,
            to = %updated.status,
            "Production stage updated"
        );

        row.try_into()
    }
}
