//! Postgres-backed `Store`. Every multi-row write uses an explicit
//! transaction with delete-then-insert semantics for child collections —
//! a report is always the full current state, never a diff.

use async_trait::async_trait;
use scnorion_core::{
    Agent, Certificate, CertType, Deployment, Profile, ProfileIssue, Release, ReleaseKey,
    RevocationReason, Settings, Site, Tenant, User, WinGetConfigExclusion,
};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::error::{StoreError, StoreResult};
use crate::traits::{AgentReportBundle, Store};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn settings_row(&self, tenant_id: Option<i32>) -> StoreResult<Settings> {
        let row = match tenant_id {
            Some(id) => {
                sqlx::query(
                    "SELECT tenant_id, report_frequency_minutes, profile_frequency_minutes,
                            sftp_disabled, remote_assistance_disabled, auto_admit_agents,
                            default_sender, smtp
                     FROM settings WHERE tenant_id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => None,
        };
        let row = match row {
            Some(r) => r,
            None => sqlx::query(
                "SELECT tenant_id, report_frequency_minutes, profile_frequency_minutes,
                        sftp_disabled, remote_assistance_disabled, auto_admit_agents,
                        default_sender, smtp
                 FROM settings WHERE tenant_id IS NULL",
            )
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("global settings".into()))?,
        };
        let smtp_json: Option<serde_json::Value> = row.try_get("smtp")?;
        let smtp = smtp_json
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| StoreError::NotFound(format!("malformed smtp settings: {e}")))?;
        Ok(Settings {
            tenant_id: row.try_get("tenant_id")?,
            report_frequency_minutes: row.try_get("report_frequency_minutes")?,
            profile_frequency_minutes: row.try_get("profile_frequency_minutes")?,
            sftp_disabled: row.try_get("sftp_disabled")?,
            remote_assistance_disabled: row.try_get("remote_assistance_disabled")?,
            auto_admit_agents: row.try_get("auto_admit_agents")?,
            default_sender: row.try_get("default_sender")?,
            smtp,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_default_tenant(&self) -> StoreResult<Tenant> {
        let row = sqlx::query("SELECT id, name, is_default FROM tenants WHERE is_default = true")
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("default tenant".into()))?;
        Ok(Tenant {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            is_default: row.try_get("is_default")?,
        })
    }

    async fn get_default_site(&self, tenant_id: i32) -> StoreResult<Site> {
        let row = sqlx::query(
            "SELECT id, tenant_id, name, is_default FROM sites WHERE tenant_id = $1 AND is_default = true",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("default site for tenant {tenant_id}")))?;
        Ok(Site {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            name: row.try_get("name")?,
            is_default: row.try_get("is_default")?,
        })
    }

    async fn validate_tenant_and_site(&self, tenant_id: i32, site_id: i32) -> StoreResult<()> {
        let row = sqlx::query("SELECT 1 FROM sites WHERE id = $1 AND tenant_id = $2")
            .bind(site_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or_else(|| StoreError::NotFound(format!("site {site_id} under tenant {tenant_id}")))
            .map(|_| ())
    }

    async fn get_tenant_from_agent_id(
        &self,
        agent_id: &str,
        fallback_tenant_id: &str,
    ) -> StoreResult<i32> {
        let row = sqlx::query(
            "SELECT s.tenant_id FROM agents a JOIN sites s ON s.id = a.site_id WHERE a.agent_id = $1",
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.try_get("tenant_id")?),
            None if !fallback_tenant_id.is_empty() => fallback_tenant_id
                .parse::<i32>()
                .map_err(|_| StoreError::NotFound(format!("agent {agent_id}"))),
            None => Err(StoreError::NotFound(format!("agent {agent_id}"))),
        }
    }

    async fn get_settings(&self, tenant_id: Option<i32>) -> StoreResult<Settings> {
        self.settings_row(tenant_id).await
    }

    async fn get_smtp_settings(&self, tenant_id: Option<i32>) -> StoreResult<Settings> {
        self.settings_row(tenant_id).await
    }

    async fn get_agent(&self, agent_id: &str) -> StoreResult<Agent> {
        let row = sqlx::query("SELECT payload FROM agents WHERE agent_id = $1")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("agent {agent_id}")))?;
        let payload: serde_json::Value = row.try_get("payload")?;
        serde_json::from_value(payload)
            .map_err(|e| StoreError::NotFound(format!("malformed agent row: {e}")))
    }

    async fn save_agent_info(&self, agent: &Agent, bundle: &AgentReportBundle) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let payload = serde_json::to_value(agent)
            .map_err(|e| StoreError::NotFound(format!("cannot serialize agent: {e}")))?;
        sqlx::query(
            "INSERT INTO agents (agent_id, site_id, payload, last_contact)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (agent_id) DO UPDATE SET site_id = $2, payload = $3, last_contact = $4",
        )
        .bind(&agent.agent_id)
        .bind(agent.site_id)
        .bind(&payload)
        .bind(agent.last_contact)
        .execute(&mut *tx)
        .await?;

        // The owned singular records (one row per agent, replaced wholesale)
        // and the owned collections (zero or more rows, same replace
        // semantics) both live behind `DELETE` + `INSERT` in this one
        // transaction, so a reader never observes a partial delete
        // (`spec.md` §4.4.1 step 7 / §8's "never a mix" invariant).
        replace_singular(&mut tx, "agent_computer", &agent.agent_id, bundle.computer.as_ref()).await?;
        replace_singular(
            &mut tx,
            "agent_operating_system",
            &agent.agent_id,
            bundle.operating_system.as_ref(),
        )
        .await?;
        replace_singular(
            &mut tx,
            "agent_system_updates",
            &agent.agent_id,
            bundle.system_updates.as_ref(),
        )
        .await?;

        replace_collection(&mut tx, "agent_antivirus", &agent.agent_id, &bundle.antivirus).await?;
        replace_collection(&mut tx, "agent_applications", &agent.agent_id, &bundle.applications).await?;
        replace_collection(&mut tx, "agent_monitors", &agent.agent_id, &bundle.monitors).await?;
        replace_collection(&mut tx, "agent_memory_slots", &agent.agent_id, &bundle.memory_slots).await?;
        replace_collection(&mut tx, "agent_logical_disks", &agent.agent_id, &bundle.logical_disks).await?;
        replace_collection(&mut tx, "agent_physical_disks", &agent.agent_id, &bundle.physical_disks).await?;
        replace_collection(&mut tx, "agent_printers", &agent.agent_id, &bundle.printers).await?;
        replace_collection(&mut tx, "agent_network_adapters", &agent.agent_id, &bundle.network_adapters).await?;
        replace_collection(&mut tx, "agent_shares", &agent.agent_id, &bundle.shares).await?;
        replace_collection(&mut tx, "agent_os_updates", &agent.agent_id, &bundle.os_updates).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_agent_waiting_for_admission_again(&self, agent_id: &str) -> StoreResult<()> {
        sqlx::query("UPDATE agents SET admission_status = 'waiting_for_admission' WHERE agent_id = $1")
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_agent_connectivity_flags(
        &self,
        agent_id: &str,
        sftp_service: bool,
        remote_assistance: bool,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE agents SET sftp_service = $2, remote_assistance = $3 WHERE agent_id = $1",
        )
        .bind(agent_id)
        .bind(sftp_service)
        .bind(remote_assistance)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_release_by_key(&self, key: &ReleaseKey) -> StoreResult<Release> {
        let row = sqlx::query(
            "SELECT id, kind, version, channel, os, arch, checksum, url
             FROM releases WHERE kind = $1 AND version = $2 AND channel = $3 AND os = $4 AND arch = $5",
        )
        .bind(&key.kind)
        .bind(&key.version)
        .bind(&key.channel)
        .bind(&key.os)
        .bind(&key.arch)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("release {key:?}")))?;
        Ok(Release {
            id: row.try_get("id")?,
            key: key.clone(),
            checksum: row.try_get("checksum")?,
            url: row.try_get("url")?,
        })
    }

    async fn save_release_info(&self, release: &Release) -> StoreResult<i64> {
        let row = sqlx::query(
            "INSERT INTO releases (kind, version, channel, os, arch, checksum, url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (kind, version, channel, os, arch) DO UPDATE SET checksum = $6, url = $7
             RETURNING id",
        )
        .bind(&release.key.kind)
        .bind(&release.key.version)
        .bind(&release.key.channel)
        .bind(&release.key.os)
        .bind(&release.key.arch)
        .bind(&release.checksum)
        .bind(&release.url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }

    async fn get_deployment(&self, agent_id: &str, package_id: &str) -> StoreResult<Deployment> {
        let row = sqlx::query(
            "SELECT agent_id, package_id, installed_at, updated_at, failed, by_profile
             FROM deployments WHERE agent_id = $1 AND package_id = $2",
        )
        .bind(agent_id)
        .bind(package_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("deployment {agent_id}/{package_id}")))?;
        deployment_from_row(row)
    }

    async fn upsert_deployment(&self, deployment: &Deployment) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO deployments (agent_id, package_id, installed_at, updated_at, failed, by_profile)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (agent_id, package_id) DO UPDATE SET
                updated_at = $4, failed = $5, by_profile = $6",
        )
        .bind(&deployment.agent_id)
        .bind(&deployment.package_id)
        .bind(deployment.installed_at)
        .bind(deployment.updated_at)
        .bind(deployment.failed)
        .bind(deployment.by_profile)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_deployment(&self, agent_id: &str, package_id: &str) -> StoreResult<Option<Deployment>> {
        let row = sqlx::query(
            "DELETE FROM deployments WHERE agent_id = $1 AND package_id = $2
             RETURNING agent_id, package_id, installed_at, updated_at, failed, by_profile",
        )
        .bind(agent_id)
        .bind(package_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(deployment_from_row).transpose()
    }

    async fn get_deployed_packages(&self, agent_id: &str) -> StoreResult<Vec<Deployment>> {
        let rows = sqlx::query(
            "SELECT agent_id, package_id, installed_at, updated_at, failed, by_profile
             FROM deployments WHERE agent_id = $1",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(deployment_from_row).collect()
    }

    async fn upsert_winget_exclusion(&self, agent_id: &str, package_id: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO winget_config_exclusions (agent_id, package_id) VALUES ($1, $2)
             ON CONFLICT (agent_id, package_id) DO NOTHING",
        )
        .bind(agent_id)
        .bind(package_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_winget_exclusion(&self, agent_id: &str, package_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM winget_config_exclusions WHERE agent_id = $1 AND package_id = $2")
            .bind(agent_id)
            .bind(package_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_excluded_winget_packages(&self, agent_id: &str) -> StoreResult<Vec<WinGetConfigExclusion>> {
        let rows = sqlx::query("SELECT agent_id, package_id FROM winget_config_exclusions WHERE agent_id = $1")
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(WinGetConfigExclusion {
                    agent_id: row.try_get("agent_id")?,
                    package_id: row.try_get("package_id")?,
                })
            })
            .collect()
    }

    async fn get_profiles_for_agent(&self, agent_id: &str) -> StoreResult<Vec<Profile>> {
        let rows = sqlx::query(
            "SELECT p.id, p.name, p.site_id, p.apply_to_all, p.tags, p.tasks
             FROM profiles p
             JOIN agents a ON a.site_id = p.site_id
             WHERE a.agent_id = $1
             ORDER BY p.apply_to_all DESC, p.id ASC",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let tasks_json: serde_json::Value = row.try_get("tasks")?;
                let tasks = serde_json::from_value(tasks_json)
                    .map_err(|e| StoreError::NotFound(format!("malformed profile tasks: {e}")))?;
                let tags_json: serde_json::Value = row.try_get("tags")?;
                let tags = serde_json::from_value(tags_json)
                    .map_err(|e| StoreError::NotFound(format!("malformed profile tags: {e}")))?;
                Ok(Profile {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    site_id: row.try_get("site_id")?,
                    apply_to_all: row.try_get("apply_to_all")?,
                    tags,
                    tasks,
                })
            })
            .collect()
    }

    async fn upsert_profile_issue(&self, issue: &ProfileIssue) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO profile_issues (profile_id, agent_id, message) VALUES ($1, $2, $3)
             ON CONFLICT (profile_id, agent_id) DO UPDATE SET message = $3",
        )
        .bind(issue.profile_id)
        .bind(&issue.agent_id)
        .bind(&issue.message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_profile_issue(&self, profile_id: i64, agent_id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM profile_issues WHERE profile_id = $1 AND agent_id = $2")
            .bind(profile_id)
            .bind(agent_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_certificate(&self, certificate: &Certificate) -> StoreResult<i64> {
        let cert_type = match certificate.cert_type {
            CertType::User => "user",
            CertType::Agent => "agent",
        };
        let row = sqlx::query(
            "INSERT INTO certificates (serial, cert_type, description, user_id, not_before, not_after)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(certificate.serial)
        .bind(cert_type)
        .bind(&certificate.description)
        .bind(certificate.user_id)
        .bind(certificate.not_before)
        .bind(certificate.not_after)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }

    /// Certificates are never updated in place (`spec.md` §3): supersession
    /// deletes the live row and files a `RevocationRecord`, rather than
    /// flipping an in-place `revoked` flag.
    async fn revoke_certificates_by_description(
        &self,
        description: &str,
        reason: RevocationReason,
    ) -> StoreResult<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query("DELETE FROM certificates WHERE description = $1 RETURNING id")
            .bind(description)
            .fetch_all(&mut *tx)
            .await?;

        let reason_str = revocation_reason_str(reason);
        let mut revoked_ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            sqlx::query(
                "INSERT INTO revocation_records (certificate_id, reason, revoked_at) VALUES ($1, $2, now())",
            )
            .bind(id)
            .bind(reason_str)
            .execute(&mut *tx)
            .await?;
            revoked_ids.push(id);
        }
        tx.commit().await?;
        Ok(revoked_ids)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<User> {
        let row = sqlx::query(
            "SELECT id, tenant_id, email, email_verified, certificate_sent, certificate_id, certificate_expiry
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("user {email}")))?;
        Ok(User {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            email: row.try_get("email")?,
            email_verified: row.try_get("email_verified")?,
            certificate_sent: row.try_get("certificate_sent")?,
            certificate_id: row.try_get("certificate_id")?,
            certificate_expiry: row.try_get("certificate_expiry")?,
        })
    }

    async fn set_certificate_sent(&self, user_id: i64, certificate_id: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users SET certificate_sent = true, certificate_id = $2 WHERE id = $1",
        )
        .bind(user_id)
        .bind(certificate_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_email_verified(&self, user_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE users SET email_verified = true WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Replaces a one-row-per-agent child record: delete whatever `table` has
/// for `agent_id`, then insert the report's value if it carried one. Stored
/// as a single `data` JSONB column, the same payload-column idiom the
/// agent row itself uses, since the schema for each of these tables is
/// pre-existing and out of this core's scope (`spec.md` §1).
async fn replace_singular<T: serde::Serialize>(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    table: &str,
    agent_id: &str,
    value: Option<&T>,
) -> StoreResult<()> {
    sqlx::query(&format!("DELETE FROM {table} WHERE agent_id = $1"))
        .bind(agent_id)
        .execute(&mut **tx)
        .await?;
    if let Some(value) = value {
        let data = serde_json::to_value(value)
            .map_err(|e| StoreError::NotFound(format!("cannot serialize {table} row: {e}")))?;
        sqlx::query(&format!("INSERT INTO {table} (agent_id, data) VALUES ($1, $2)"))
            .bind(agent_id)
            .bind(&data)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Replaces an owned collection: delete every row `table` has for
/// `agent_id`, then insert one row per item. Same delete-then-insert
/// transaction boundary as `replace_singular`, just zero-or-more rows
/// instead of zero-or-one.
async fn replace_collection<T: serde::Serialize>(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    table: &str,
    agent_id: &str,
    items: &[T],
) -> StoreResult<()> {
    sqlx::query(&format!("DELETE FROM {table} WHERE agent_id = $1"))
        .bind(agent_id)
        .execute(&mut **tx)
        .await?;
    for item in items {
        let data = serde_json::to_value(item)
            .map_err(|e| StoreError::NotFound(format!("cannot serialize {table} row: {e}")))?;
        sqlx::query(&format!("INSERT INTO {table} (agent_id, data) VALUES ($1, $2)"))
            .bind(agent_id)
            .bind(&data)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

fn revocation_reason_str(reason: RevocationReason) -> &'static str {
    match reason {
        RevocationReason::Unspecified => "unspecified",
        RevocationReason::Superseded => "superseded",
        RevocationReason::CessationOfOperation => "cessation_of_operation",
        RevocationReason::KeyCompromise => "key_compromise",
    }
}

fn deployment_from_row(row: sqlx::postgres::PgRow) -> StoreResult<Deployment> {
    Ok(Deployment {
        agent_id: row.try_get("agent_id")?,
        package_id: row.try_get("package_id")?,
        installed_at: row.try_get("installed_at")?,
        updated_at: row.try_get("updated_at")?,
        failed: row.try_get("failed")?,
        by_profile: row.try_get("by_profile")?,
    })
}
