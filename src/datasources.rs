//! XML data-source descriptor consumed by the discovery front end.
//!
//! The document lists one data source, the service's default one, and every
//! hosted catalog with its definition. Remote catalogs are not listed; the
//! front end can only serve catalogs of the local engine.

use std::fmt::Write as _;

use crate::error::OlapResult;
use crate::registry::HostedCatalogInfo;
use crate::service::OlapService;

impl OlapService {
    /// Generate the descriptor, reading the registry as the system identity
    /// when security is enabled.
    pub fn datasources_xml(&self) -> OlapResult<String> {
        self.run_privileged(None, |_| self.generate_datasources_xml())
    }

    fn generate_datasources_xml(&self) -> OlapResult<String> {
        let registry = self.registry()?;
        let mut catalogs = Vec::new();
        for name in registry.hosted_names()? {
            catalogs.push(registry.hosted_info(&name)?);
        }
        Ok(render_datasources(
            &self.config.data_source_name,
            &self.config.data_source_description,
            &self.config.provider_name,
            &catalogs,
        ))
    }
}

pub fn render_datasources(
    data_source: &str,
    description: &str,
    provider: &str,
    catalogs: &[HostedCatalogInfo],
) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<DataSources>\n");
    xml.push_str("<DataSource>\n");
    let _ = writeln!(xml, "<DataSourceName>{}</DataSourceName>", escape(data_source));
    let _ = writeln!(
        xml,
        "<DataSourceDescription>{}</DataSourceDescription>",
        escape(description)
    );
    xml.push_str("<URL>Xmla</URL>\n");
    xml.push_str("<DataSourceInfo>Provider=mondrian</DataSourceInfo>\n");
    let _ = writeln!(xml, "<ProviderName>{}</ProviderName>", escape(provider));
    xml.push_str("<ProviderType>MDP</ProviderType>\n");
    xml.push_str("<AuthenticationMode>Unauthenticated</AuthenticationMode>\n");
    xml.push_str("<Catalogs>\n");
    for catalog in catalogs {
        let _ = writeln!(xml, "<Catalog name=\"{}\">", escape(&catalog.name));
        if let Some(info) = &catalog.data_source_info {
            let _ = writeln!(xml, "<DataSourceInfo>{}</DataSourceInfo>", escape(info));
        }
        let _ = writeln!(xml, "<Definition>{}</Definition>", escape(&catalog.definition));
        xml.push_str("</Catalog>\n");
    }
    xml.push_str("</Catalogs>\n");
    xml.push_str("</DataSource>\n");
    xml.push_str("</DataSources>\n");
    xml
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
