//! `unikraft-cloud_certificate`: a TLS certificate for custom domains.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{created_uuid, decode, non_empty, reconcile, Resource, CERTIFICATE};
use crate::error::ProviderError;
use crate::platform::{Certificate, Client, CreateCertificateRequest};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};

/// The certificate resource.
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateResource;

#[derive(Default, Deserialize)]
#[serde(default)]
struct CertificateConfig {
    name: Option<String>,
    cn: String,
    chain: String,
    pkey: String,
}

impl From<CertificateConfig> for CreateCertificateRequest {
    fn from(config: CertificateConfig) -> Self {
        CreateCertificateRequest {
            name: config.name,
            cn: config.cn,
            chain: config.chain,
            pkey: config.pkey,
        }
    }
}

/// Schema of the certificate resource.
pub(crate) fn certificate_schema() -> Schema {
    Schema::v0()
        .with_description("A TLS certificate uploaded to Unikraft Cloud.")
        .with_attribute("uuid", Attribute::computed_string())
        .with_attribute("created_at", Attribute::computed_string())
        .with_attribute("state", Attribute::computed_string())
        .with_attribute("subject", Attribute::computed_string())
        .with_attribute("issuer", Attribute::computed_string())
        .with_attribute("serial_number", Attribute::computed_string())
        .with_attribute("not_before", Attribute::computed_string())
        .with_attribute("not_after", Attribute::computed_string())
        .with_attribute(
            "service_groups",
            Attribute::of(
                AttributeType::list(AttributeType::String),
                AttributeFlags::computed(),
            )
            .with_description("UUIDs of the service groups using the certificate."),
        )
        .with_attribute("name", Attribute::optional_computed_string().with_force_new())
        .with_attribute(
            "cn",
            Attribute::required_string()
                .with_force_new()
                .with_description("Common name, e.g. `*.example.com`."),
        )
        .with_attribute(
            "chain",
            Attribute::required_string()
                .with_force_new()
                .with_description("PEM-encoded certificate chain."),
        )
        .with_attribute(
            "pkey",
            Attribute::required_string()
                .sensitive()
                .with_force_new()
                .with_description("PEM-encoded private key."),
        )
}

/// The API-owned part of a certificate state. The chain and key are never
/// returned by the API.
pub(crate) fn certificate_state(certificate: &Certificate) -> Map<String, Value> {
    let service_groups: Vec<&str> = certificate
        .service_groups
        .iter()
        .filter_map(|g| g.uuid.as_deref())
        .collect();

    let mut state = Map::new();
    state.insert("uuid".to_string(), json!(certificate.uuid));
    state.insert("name".to_string(), json!(certificate.name));
    state.insert("created_at".to_string(), json!(certificate.created_at));
    state.insert("state".to_string(), json!(certificate.state));
    state.insert("cn".to_string(), json!(certificate.common_name));
    state.insert("subject".to_string(), json!(certificate.subject));
    state.insert("issuer".to_string(), json!(certificate.issuer));
    state.insert("serial_number".to_string(), json!(certificate.serial_number));
    state.insert("not_before".to_string(), json!(certificate.not_before));
    state.insert("not_after".to_string(), json!(certificate.not_after));
    state.insert(
        "service_groups".to_string(),
        non_empty(json!(service_groups)),
    );
    state
}

#[async_trait::async_trait]
impl Resource for CertificateResource {
    fn type_name(&self) -> &'static str {
        CERTIFICATE
    }

    fn schema(&self) -> Schema {
        certificate_schema()
    }

    async fn create(&self, client: &Client, planned: &Value) -> Result<String, ProviderError> {
        let request = CreateCertificateRequest::from(decode::<CertificateConfig>(planned)?);
        debug!(cn = %request.cn, "uploading certificate");
        let certificate = client
            .create_certificate(&request)
            .await
            .map_err(|e| ProviderError::client("create certificate", e))?;
        created_uuid(certificate.uuid, "certificate")
    }

    async fn get(
        &self,
        client: &Client,
        uuid: &str,
        prior: &Value,
    ) -> Result<Value, ProviderError> {
        let certificate = client
            .get_certificate(uuid)
            .await
            .map_err(|e| ProviderError::client("read certificate", e))?;
        Ok(reconcile(
            &certificate_schema(),
            certificate_state(&certificate),
            prior,
        ))
    }

    async fn delete(&self, client: &Client, uuid: &str) -> Result<(), ProviderError> {
        client
            .delete_certificate(uuid)
            .await
            .map(drop)
            .map_err(|e| ProviderError::client("delete certificate", e))
    }
}
