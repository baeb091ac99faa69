//! Classification of raw graph node addresses.
//!
//! A raw node label encodes a block address: repeated `module.<name>`
//! prefixes followed by the block itself, e.g.
//! `module.net.module.sub.aws_subnet.priv[0]`. [`classify`] turns such a
//! label into a structured [`BlockDescriptor`].
//!
//! Classification is total and deterministic: malformed input is classified
//! as [`BlockKind::Unknown`] with a warning, never an error.

use log::warn;

/// The kind of configuration block a node address refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// A managed resource block (`aws_instance.app`).
    Resource,
    /// A data source block (`data.aws_ami.ubuntu`).
    Data,
    /// An input variable (`var.region`).
    Variable,
    /// A local value (`local.name`).
    Local,
    /// An output value (`output.endpoint`).
    Output,
    /// A provider configuration (`provider["…/aws"]`).
    Provider,
    /// A module call with no local block remainder (`module.net`).
    Module,
    /// Anything that could not be classified.
    Unknown,
}

/// Structured descriptor derived from a raw node address.
///
/// `parent_modules` reflects strict containment order, outermost first; an
/// address with N `module <name>` segments yields exactly N-1 parent modules
/// plus one `module_name` (the innermost).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// The full address as given, used as the canonical group key.
    pub canonical_address: String,
    /// Classified block kind.
    pub kind: BlockKind,
    /// Immediate enclosing module name, empty for the root module.
    pub module_name: String,
    /// Enclosing module chain above `module_name`, outermost first.
    pub parent_modules: Vec<String>,
    /// Whether a resource remainder carries both a type and an instance name.
    pub has_instance_name: bool,
    /// Resource or data source type, when the remainder has one.
    pub resource_type: Option<String>,
    /// Resource or data source instance name, when the remainder has one.
    pub resource_name: Option<String>,
}

impl BlockDescriptor {
    /// Returns the full module path (`parent_modules` + `module_name`).
    pub fn module_path(&self) -> Vec<String> {
        let mut path = self.parent_modules.clone();
        if !self.module_name.is_empty() {
            path.push(self.module_name.clone());
        }
        path
    }

    /// Returns the module path joined with `.`, empty for root.
    pub fn module_path_joined(&self) -> String {
        self.module_path().join(".")
    }
}

/// Type prefixes that identify a segment as a cloud resource type.
const RESOURCE_TYPE_PREFIXES: &[&str] = &[
    "aws_",
    "google_",
    "azurerm_",
    "azuread_",
    "alicloud_",
    "oci_",
    "ibm_",
    "digitalocean_",
    "kubernetes_",
    "helm_",
    "random_",
    "null_",
    "tls_",
    "local_",
    "template_",
];

/// Classifies a raw graph node address into a [`BlockDescriptor`].
///
/// Module prefixes are stripped left to right: each literal `module` segment
/// captures the following segment as a module name. The first captured name
/// becomes `module_name` only when no further `module` segment follows it,
/// otherwise it is pushed onto `parent_modules`. The remainder is classified
/// by fixed prefixes.
///
/// # Examples
///
/// ```
/// use terrane_core::address::{BlockKind, classify};
///
/// let desc = classify("module.net.module.sub.aws_subnet.priv");
/// assert_eq!(desc.kind, BlockKind::Resource);
/// assert_eq!(desc.parent_modules, vec!["net".to_string()]);
/// assert_eq!(desc.module_name, "sub");
/// assert!(desc.has_instance_name);
/// ```
pub fn classify(raw: &str) -> BlockDescriptor {
    let canonical = raw.trim().to_string();
    let mut parent_modules = Vec::new();
    let mut module_name = String::new();
    let mut rest = canonical.as_str();

    // Strip repeated `module.<name>` prefixes.
    while let Some(tail) = rest.strip_prefix("module.") {
        let (name, after) = split_first_segment(tail);
        if name.is_empty() {
            // Trailing `module.` with nothing after it, leave for the
            // remainder classification to flag as unknown.
            break;
        }
        if !module_name.is_empty() {
            parent_modules.push(std::mem::take(&mut module_name));
        }
        module_name = name.to_string();
        rest = after;
    }

    let mut descriptor = BlockDescriptor {
        canonical_address: canonical.clone(),
        kind: BlockKind::Unknown,
        module_name,
        parent_modules,
        has_instance_name: false,
        resource_type: None,
        resource_name: None,
    };

    if rest.is_empty() {
        if descriptor.module_name.is_empty() {
            warn!(address = canonical.as_str(); "empty graph node address");
        } else {
            // A bare module reference with no local block.
            descriptor.kind = BlockKind::Module;
        }
        return descriptor;
    }

    if let Some(tail) = rest.strip_prefix("data.") {
        descriptor.kind = BlockKind::Data;
        let (resource_type, after) = split_first_segment(tail);
        let (resource_name, _) = split_first_segment(after);
        if !resource_type.is_empty() {
            descriptor.resource_type = Some(strip_index(resource_type).to_string());
        }
        if !resource_name.is_empty() {
            descriptor.resource_name = Some(strip_index(resource_name).to_string());
            descriptor.has_instance_name = true;
        }
    } else if rest.starts_with("var.") {
        descriptor.kind = BlockKind::Variable;
    } else if rest.starts_with("local.") {
        descriptor.kind = BlockKind::Local;
    } else if rest.starts_with("output.") {
        descriptor.kind = BlockKind::Output;
    } else if rest.starts_with("provider[") || rest.starts_with("provider.") {
        descriptor.kind = BlockKind::Provider;
    } else if RESOURCE_TYPE_PREFIXES
        .iter()
        .any(|prefix| rest.starts_with(prefix))
    {
        descriptor.kind = BlockKind::Resource;
        let (resource_type, after) = split_first_segment(rest);
        let (resource_name, _) = split_first_segment(after);
        descriptor.resource_type = Some(strip_index(resource_type).to_string());
        if !resource_name.is_empty() {
            descriptor.resource_name = Some(strip_index(resource_name).to_string());
            descriptor.has_instance_name = true;
        }
    } else {
        warn!(address = canonical.as_str(); "unclassified graph node address");
    }

    descriptor
}

/// Splits off the first dot-separated segment, returning it and the rest
/// with the separating dot removed.
fn split_first_segment(input: &str) -> (&str, &str) {
    match input.split_once('.') {
        Some((head, tail)) => (head, tail),
        None => (input, ""),
    }
}

/// Removes a trailing `[…]` instance index from a segment.
fn strip_index(segment: &str) -> &str {
    match segment.find('[') {
        Some(idx) => &segment[..idx],
        None => segment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_resource() {
        let desc = classify("aws_instance.app");
        assert_eq!(desc.kind, BlockKind::Resource);
        assert_eq!(desc.module_name, "");
        assert!(desc.parent_modules.is_empty());
        assert!(desc.has_instance_name);
        assert_eq!(desc.resource_type.as_deref(), Some("aws_instance"));
        assert_eq!(desc.resource_name.as_deref(), Some("app"));
        assert_eq!(desc.canonical_address, "aws_instance.app");
    }

    #[test]
    fn test_resource_without_instance_name() {
        let desc = classify("aws_instance");
        assert_eq!(desc.kind, BlockKind::Resource);
        assert!(!desc.has_instance_name);
        assert_eq!(desc.resource_name, None);
    }

    #[test]
    fn test_indexed_instance() {
        let desc = classify("module.net.aws_subnet.priv[0]");
        assert_eq!(desc.kind, BlockKind::Resource);
        assert_eq!(desc.module_name, "net");
        assert_eq!(desc.resource_name.as_deref(), Some("priv"));
        assert!(desc.has_instance_name);
    }

    #[test]
    fn test_nested_modules() {
        let desc = classify("module.net.module.sub.aws_subnet.priv");
        assert_eq!(desc.parent_modules, vec!["net".to_string()]);
        assert_eq!(desc.module_name, "sub");
        assert_eq!(desc.module_path(), vec!["net".to_string(), "sub".to_string()]);
        assert_eq!(desc.module_path_joined(), "net.sub");
    }

    #[test]
    fn test_triple_nested_modules() {
        let desc = classify("module.a.module.b.module.c.aws_instance.x");
        assert_eq!(
            desc.parent_modules,
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(desc.module_name, "c");
    }

    #[test]
    fn test_bare_module_reference() {
        let desc = classify("module.net");
        assert_eq!(desc.kind, BlockKind::Module);
        assert_eq!(desc.module_name, "net");
        assert!(!desc.has_instance_name);
    }

    #[test]
    fn test_data_source() {
        let desc = classify("data.aws_ami.ubuntu");
        assert_eq!(desc.kind, BlockKind::Data);
        assert_eq!(desc.resource_type.as_deref(), Some("aws_ami"));
        assert_eq!(desc.resource_name.as_deref(), Some("ubuntu"));
        assert!(desc.has_instance_name);
    }

    #[test]
    fn test_variable_local_output() {
        assert_eq!(classify("var.region").kind, BlockKind::Variable);
        assert_eq!(classify("local.name_prefix").kind, BlockKind::Local);
        assert_eq!(classify("output.endpoint").kind, BlockKind::Output);
        assert_eq!(
            classify("module.net.var.cidr").kind,
            BlockKind::Variable
        );
    }

    #[test]
    fn test_provider() {
        let desc = classify("provider[\"registry.terraform.io/hashicorp/aws\"]");
        assert_eq!(desc.kind, BlockKind::Provider);
    }

    #[test]
    fn test_unknown_never_fails() {
        assert_eq!(classify("meta.count-boundary").kind, BlockKind::Unknown);
        assert_eq!(classify("root").kind, BlockKind::Unknown);
        assert_eq!(classify("").kind, BlockKind::Unknown);
        assert_eq!(classify("module.").kind, BlockKind::Unknown);
    }
}
