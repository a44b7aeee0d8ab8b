//! 提交 bug 与功能建议
//!
//! 顺序：字段校验 → 蜜罐 → 限流 → 远程写入。校验失败与蜜罐命中都不消耗限流额度。

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::backend::FeedbackBackend;
use crate::error::SubmitError;
use crate::honeypot::is_honeypot_filled;
use crate::models::{BugEnvironment, BugSeverity, CreatedBug, MODULES, NewBug, NewFeature};
use crate::rate_limit::{RateLimitConfig, RateLimiter, RateLimits, actions, format_remaining_time};

pub const TITLE_MAX_CHARS: usize = 120;
pub const BUG_DESCRIPTION_MAX_CHARS: usize = 4000;
pub const FEATURE_DESCRIPTION_MAX_CHARS: usize = 2000;

/// bug 表单；空字符串的可选字段按未填写处理
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BugForm {
    pub title: String,
    pub description: String,
    pub repro_steps: String,
    pub expected_result: String,
    pub actual_result: String,
    pub module: String,
    pub severity: Option<BugSeverity>,
    pub page_url: String,
    /// 蜜罐字段
    pub website_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeatureForm {
    pub title: String,
    pub description: String,
    /// 蜜罐字段
    pub website_url: String,
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn validate_text(value: &str, field: &str, max_chars: usize) -> Result<(), SubmitError> {
    if value.trim().is_empty() {
        return Err(SubmitError::Invalid(format!("O campo {} é obrigatório.", field)));
    }
    if value.chars().count() > max_chars {
        return Err(SubmitError::Invalid(format!(
            "O campo {} deve ter no máximo {} caracteres.",
            field, max_chars
        )));
    }
    Ok(())
}

impl BugForm {
    fn validate(&self) -> Result<(), SubmitError> {
        validate_text(&self.title, "título", TITLE_MAX_CHARS)?;
        validate_text(&self.description, "descrição", BUG_DESCRIPTION_MAX_CHARS)?;
        if !self.module.is_empty() && !MODULES.contains(&self.module.as_str()) {
            return Err(SubmitError::Invalid(format!(
                "Módulo inválido: {}.",
                self.module
            )));
        }
        Ok(())
    }

    fn into_new_bug(self, environment: BugEnvironment) -> NewBug {
        NewBug {
            title: self.title,
            description: self.description,
            repro_steps: non_empty(self.repro_steps),
            expected_result: non_empty(self.expected_result),
            actual_result: non_empty(self.actual_result),
            module: non_empty(self.module),
            severity: self.severity,
            environment: Some(environment),
            page_url: non_empty(self.page_url),
        }
    }
}

impl FeatureForm {
    fn validate(&self) -> Result<(), SubmitError> {
        validate_text(&self.title, "título", TITLE_MAX_CHARS)?;
        validate_text(&self.description, "descrição", FEATURE_DESCRIPTION_MAX_CHARS)
    }
}

pub struct Submitter {
    limiter: RateLimiter,
    backend: Arc<dyn FeedbackBackend>,
    limits: RateLimits,
}

impl Submitter {
    pub fn new(limiter: RateLimiter, backend: Arc<dyn FeedbackBackend>, limits: RateLimits) -> Self {
        Self {
            limiter,
            backend,
            limits,
        }
    }

    /// 蜜罐与限流检查
    async fn admit(
        &self,
        honeypot: &str,
        action: &str,
        config: &RateLimitConfig,
    ) -> Result<(), SubmitError> {
        if is_honeypot_filled(honeypot) {
            warn!("Honeypot filled on {}, rejecting submission", action);
            return Err(SubmitError::Spam);
        }

        if !self.limiter.check(action, config).await {
            let remaining = self.limiter.reset_in(action).await;
            return Err(SubmitError::RateLimited {
                retry_in: format_remaining_time(remaining),
            });
        }

        Ok(())
    }

    pub async fn submit_bug(
        &self,
        form: BugForm,
        environment: BugEnvironment,
    ) -> Result<CreatedBug, SubmitError> {
        form.validate()?;
        self.admit(&form.website_url, actions::CREATE_BUG, &self.limits.create_bug)
            .await?;

        let created = self
            .backend
            .insert_bug(&form.into_new_bug(environment))
            .await?;
        info!("Bug submitted: {}", created.public_id);

        Ok(created)
    }

    pub async fn submit_feature(&self, form: FeatureForm) -> Result<String, SubmitError> {
        form.validate()?;
        self.admit(
            &form.website_url,
            actions::CREATE_FEATURE,
            &self.limits.create_feature,
        )
        .await?;

        let id = self
            .backend
            .insert_feature(&NewFeature {
                title: form.title,
                description: form.description,
            })
            .await?;
        info!("Feature request submitted: {}", id);

        Ok(id)
    }
}
