//! `unikraft-cloud_certificate` data source.

use serde_json::Value;

use super::{lookup_schema, project, DataSource, Lookup};
use crate::error::ProviderError;
use crate::platform::Client;
use crate::resources::{certificate_state, CertificateResource, Resource, CERTIFICATE};
use crate::schema::Schema;

/// Looks up a certificate by UUID or name. The chain and private key are
/// not exposed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateDataSource;

#[async_trait::async_trait]
impl DataSource for CertificateDataSource {
    fn type_name(&self) -> &'static str {
        CERTIFICATE
    }

    fn schema(&self) -> Schema {
        let mut schema = lookup_schema(
            CertificateResource.schema(),
            "Look up a Unikraft Cloud certificate.",
        );
        schema.block.attributes.remove("chain");
        schema
    }

    async fn read(&self, client: &Client, config: &Value) -> Result<Value, ProviderError> {
        let certificate = match Lookup::from_config(config)? {
            Lookup::Uuid(uuid) => client.get_certificate(&uuid).await,
            Lookup::Name(name) => client.get_certificate_by_name(&name).await,
        }
        .map_err(|e| ProviderError::client("read certificate", e))?;
        Ok(project(&self.schema(), certificate_state(&certificate)))
    }
}
