//! Default placeholder document used to bootstrap new rules.
//!
//! `checks` leaves are short descriptions of what belongs there; `metadata`
//! leaves are the `true` sentinel, meaning "verify this field". The metadata
//! layout mirrors the container inspection fields the agent compares against.

use serde_yaml::{Mapping, Value};

use crate::document::sorted_value;
use crate::error::Result;

/// Comment header written above the template in the `create` flow.
pub const CREATE_HEADER: &str = "##\n\
# This file was generated by customs.\n\
# The file must be valid yaml and is required to use the customs agent.\n\
# Please fill out the following values with their respective data types.\n\
##\n";

const CHECK_HINTS: &[(&str, &str)] = &[
    ("check", "(str) – The path to the check script to run"),
    ("interval", "(str) – The check execution interval"),
    ("ttl", "(str) – The TTL for external script check pings"),
    ("httpcheck", "(str) – An URL to check every interval"),
];

const HOST_CONFIG_FIELDS: &[&str] = &[
    "binds",
    "memory",
    "memory_swap",
    "cpu_shares",
    "cpu_period",
    "cpuset_cpus",
    "cpuset_mems",
    "cpu_quota",
    "blkio_weight",
    "memory_swappiness",
    "privileged",
    "port_bindings",
    "links",
    "publish_all_ports",
    "dns",
    "dns_search",
    "extra_hosts",
    "volumes_from",
    "devices",
    "network_mode",
    "cap_add",
    "cap_drop",
    "group_add",
    "restart_policy",
    "readonly_rootfs",
    "ulimits",
    "log_config",
];

const CONFIG_FIELDS: &[&str] = &[
    "hostname",
    "domainname",
    "user",
    "exposed_ports",
    "image",
    "volumes",
];

const DEFAULT_TAGS: &[&str] = &[
    "docker",
    "inspect.config.labels=com.freight-forwarder.project",
    "inspect.config.labels=com.freight-forwarder.team",
    "inspect.config.labels=com.freight-forwarder.type",
];

/// Pattern that matches every service.
pub const DEFAULT_SERVICE_REGEX: &str = ".*";

fn checked(fields: &[&str]) -> Value {
    Value::Mapping(
        fields
            .iter()
            .map(|f| (Value::from(*f), Value::Bool(true)))
            .collect(),
    )
}

/// Build the default template mapping.
pub fn default_template() -> Mapping {
    let checks: Mapping = CHECK_HINTS
        .iter()
        .map(|(k, hint)| (Value::from(*k), Value::from(*hint)))
        .collect();

    let mut metadata = Mapping::new();
    for field in ["id", "created", "driver", "exec_driver"] {
        metadata.insert(field.into(), Value::Bool(true));
    }
    metadata.insert("host_config".into(), checked(HOST_CONFIG_FIELDS));
    metadata.insert("mounts".into(), Value::Bool(true));
    metadata.insert("config".into(), checked(CONFIG_FIELDS));
    metadata.insert("network_settings".into(), Value::Bool(true));

    let tags = DEFAULT_TAGS.iter().map(|t| Value::from(*t)).collect();

    let mut template = Mapping::new();
    template.insert("checks".into(), Value::Mapping(checks));
    template.insert("metadata".into(), Value::Mapping(metadata));
    template.insert("service_regex".into(), DEFAULT_SERVICE_REGEX.into());
    template.insert("tags".into(), Value::Sequence(tags));
    template
}

/// Header plus the YAML rendering of [`default_template`], as written to the
/// editor buffer by `create`.
pub fn render_template() -> Result<String> {
    let body = serde_yaml::to_string(&sorted_value(Value::Mapping(default_template())))?;
    Ok(format!("{CREATE_HEADER}{body}"))
}
