//! DNS and IPv6 token rules for saved profiles.
//!
//! Profiles whose id starts with one of the configured prefixes are
//! treated as private networks and get the private resolvers plus a fixed
//! IPv6 interface token. Other wireless profiles get the public resolvers
//! and no token. Ethernet profiles that do not match keep automatic DNS.
//!
//! Planning is a pure function of the profile's type and id; applying a
//! plan replaces the `ipv4` and `ipv6` groups and leaves every other group
//! as read.

use log::{info, warn};
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use zbus::Connection;
use zvariant::{OwnedValue, Value};

use crate::Result;
use crate::connection_settings::{list_profiles, read_profile, write_profile};
use crate::constants::{connection_type, ip_settings, settings_key};
use crate::profile_settings::ProfileSettings;
use crate::proxies::SettingsMap;

/// Resolver and token policy read from the patcher's configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsPolicy {
    /// Profile id prefixes that mark a private network.
    pub prefixes: Vec<String>,
    pub private_ipv6: Vec<Ipv6Addr>,
    pub private_ipv4: Vec<Ipv4Addr>,
    pub public_ipv6: Vec<Ipv6Addr>,
    pub public_ipv4: Vec<Ipv4Addr>,
    /// IPv6 interface identifier for private networks, e.g. `::1:2`.
    pub ipv6_token: Option<String>,
}

impl DnsPolicy {
    pub fn is_private(&self, profile_id: &str) -> bool {
        self.prefixes.iter().any(|p| profile_id.starts_with(p.as_str()))
    }
}

/// Which rule a profile falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchScope {
    /// Id matches a private prefix.
    Private,
    /// Wireless profile outside the private prefixes.
    Public,
    /// Ethernet profile outside the private prefixes.
    Automatic,
}

/// The IP settings a single profile should end up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPlan {
    pub scope: PatchScope,
    pub ipv6_dns: Vec<Ipv6Addr>,
    pub ipv4_dns: Vec<Ipv4Addr>,
    pub ipv6_token: Option<String>,
}

/// Plans the patch for a profile, or `None` if its type is not patched.
pub fn plan_patch(kind: &str, profile_id: &str, policy: &DnsPolicy) -> Option<PatchPlan> {
    if kind != connection_type::WIRELESS && kind != connection_type::ETHERNET {
        return None;
    }

    let plan = if policy.is_private(profile_id) {
        PatchPlan {
            scope: PatchScope::Private,
            ipv6_dns: policy.private_ipv6.clone(),
            ipv4_dns: policy.private_ipv4.clone(),
            ipv6_token: policy.ipv6_token.clone().filter(|t| !t.is_empty()),
        }
    } else if kind == connection_type::ETHERNET {
        PatchPlan {
            scope: PatchScope::Automatic,
            ipv6_dns: Vec::new(),
            ipv4_dns: Vec::new(),
            ipv6_token: None,
        }
    } else {
        PatchPlan {
            scope: PatchScope::Public,
            ipv6_dns: policy.public_ipv6.clone(),
            ipv4_dns: policy.public_ipv4.clone(),
            ipv6_token: None,
        }
    };
    Some(plan)
}

impl PatchPlan {
    /// The replacement `ipv6` settings group.
    pub fn ipv6_group(&self) -> Result<HashMap<String, OwnedValue>> {
        let mut group = HashMap::new();
        insert(&mut group, "method", Value::from(ip_settings::METHOD_AUTO))?;
        insert(
            &mut group,
            "addr-gen-mode",
            Value::from(ip_settings::ADDR_GEN_MODE_EUI64),
        )?;
        insert(
            &mut group,
            "ip6-privacy",
            Value::from(ip_settings::IP6_PRIVACY_PREFER_TEMP),
        )?;
        insert(
            &mut group,
            "dns-priority",
            Value::from(ip_settings::IPV6_DNS_PRIORITY),
        )?;
        if self.scope != PatchScope::Automatic {
            let dns: Vec<Vec<u8>> = self.ipv6_dns.iter().map(|a| a.octets().to_vec()).collect();
            insert(&mut group, "dns", Value::from(dns))?;
        }
        if let Some(token) = &self.ipv6_token {
            insert(&mut group, "token", Value::from(token.as_str()))?;
        }
        Ok(group)
    }

    /// The replacement `ipv4` settings group.
    ///
    /// Addresses are encoded the way NetworkManager expects them: the
    /// `u32` whose in-memory bytes are the address in network order.
    pub fn ipv4_group(&self) -> Result<HashMap<String, OwnedValue>> {
        let mut group = HashMap::new();
        insert(&mut group, "method", Value::from(ip_settings::METHOD_AUTO))?;
        insert(
            &mut group,
            "dns-priority",
            Value::from(ip_settings::IPV4_DNS_PRIORITY),
        )?;
        if self.scope != PatchScope::Automatic {
            let dns: Vec<u32> = self
                .ipv4_dns
                .iter()
                .map(|a| u32::from_ne_bytes(a.octets()))
                .collect();
            insert(&mut group, "dns", Value::from(dns))?;
        }
        Ok(group)
    }

    /// Replaces the IP groups of `settings` with this plan.
    pub fn apply(&self, settings: &mut SettingsMap) -> Result<()> {
        settings.insert(settings_key::IPV6.to_string(), self.ipv6_group()?);
        settings.insert(settings_key::IPV4.to_string(), self.ipv4_group()?);
        Ok(())
    }
}

fn insert(group: &mut HashMap<String, OwnedValue>, key: &str, value: Value<'_>) -> Result<()> {
    group.insert(key.to_string(), value.try_to_owned()?);
    Ok(())
}

/// Counters of one patch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PatchSummary {
    pub updated: usize,
    /// Profiles of a type that is not patched.
    pub ignored: usize,
    pub failed: usize,
}

/// Applies `policy` to every saved wireless and ethernet profile.
///
/// Profiles that cannot be read, decoded or updated are logged and
/// counted as failed; the run continues with the rest.
pub(crate) async fn patch_profiles(conn: &Connection, policy: &DnsPolicy) -> Result<PatchSummary> {
    let mut summary = PatchSummary::default();

    for path in list_profiles(conn).await? {
        let mut settings = match read_profile(conn, &path).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Skipping profile: {e}");
                summary.failed += 1;
                continue;
            }
        };
        let profile = match ProfileSettings::decode(&settings) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Skipping profile {}: {e}", path.as_str());
                summary.failed += 1;
                continue;
            }
        };

        let Some(plan) = plan_patch(&profile.kind, &profile.id, policy) else {
            summary.ignored += 1;
            continue;
        };

        info!("Modifying connection '{}' ({:?})", profile.id, plan.scope);
        let result = match plan.apply(&mut settings) {
            Ok(()) => write_profile(conn, &path, settings).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!("Updated '{}'", profile.id);
                summary.updated += 1;
            }
            Err(e) => {
                warn!("Failed to update '{}': {e}", profile.id);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile_settings::tests::wireless_profile;

    fn policy() -> DnsPolicy {
        DnsPolicy {
            prefixes: vec!["Home".into(), "Office-".into()],
            private_ipv6: vec!["fd00::53".parse().unwrap()],
            private_ipv4: vec!["192.168.1.53".parse().unwrap()],
            public_ipv6: vec!["2606:4700:4700::1111".parse().unwrap()],
            public_ipv4: vec!["1.1.1.1".parse().unwrap(), "9.9.9.9".parse().unwrap()],
            ipv6_token: Some("::1:2".into()),
        }
    }

    #[test]
    fn private_prefix_gets_private_dns_and_token() {
        let plan = plan_patch("802-11-wireless", "Home-5G", &policy()).unwrap();
        assert_eq!(plan.scope, PatchScope::Private);
        assert_eq!(plan.ipv4_dns, ["192.168.1.53".parse::<Ipv4Addr>().unwrap()]);
        assert_eq!(plan.ipv6_token.as_deref(), Some("::1:2"));
    }

    #[test]
    fn prefix_match_is_anchored_and_case_sensitive() {
        let p = policy();
        assert!(p.is_private("Office-Guest"));
        assert!(!p.is_private("My Office-Guest"));
        assert!(!p.is_private("home"));
    }

    #[test]
    fn public_wireless_gets_public_dns_without_token() {
        let plan = plan_patch("802-11-wireless", "Airport", &policy()).unwrap();
        assert_eq!(plan.scope, PatchScope::Public);
        assert_eq!(plan.ipv4_dns.len(), 2);
        assert_eq!(plan.ipv6_token, None);

        let ipv6 = plan.ipv6_group().unwrap();
        assert!(ipv6.contains_key("dns"));
        assert!(!ipv6.contains_key("token"));
    }

    #[test]
    fn private_ethernet_is_patched_like_private_wireless() {
        let plan = plan_patch("802-3-ethernet", "Office-Dock", &policy()).unwrap();
        assert_eq!(plan.scope, PatchScope::Private);
    }

    #[test]
    fn other_ethernet_keeps_automatic_dns() {
        let plan = plan_patch("802-3-ethernet", "Wired connection 1", &policy()).unwrap();
        assert_eq!(plan.scope, PatchScope::Automatic);

        let ipv6 = plan.ipv6_group().unwrap();
        let ipv4 = plan.ipv4_group().unwrap();
        assert!(!ipv6.contains_key("dns"));
        assert!(!ipv6.contains_key("token"));
        assert!(!ipv4.contains_key("dns"));
        assert_eq!(*ipv4["method"], Value::from("auto"));
    }

    #[test]
    fn other_types_are_not_patched() {
        assert_eq!(plan_patch("vpn", "Home VPN", &policy()), None);
        assert_eq!(plan_patch("bluetooth", "Phone", &policy()), None);
    }

    #[test]
    fn empty_token_is_not_written() {
        let mut p = policy();
        p.ipv6_token = Some(String::new());
        let plan = plan_patch("802-11-wireless", "Home", &p).unwrap();
        assert_eq!(plan.ipv6_token, None);
    }

    #[test]
    fn ipv6_group_contents() {
        let plan = plan_patch("802-11-wireless", "Home", &policy()).unwrap();
        let ipv6 = plan.ipv6_group().unwrap();

        assert_eq!(*ipv6["method"], Value::from("auto"));
        assert_eq!(*ipv6["addr-gen-mode"], Value::from(0i32));
        assert_eq!(*ipv6["ip6-privacy"], Value::from(2i32));
        assert_eq!(*ipv6["dns-priority"], Value::from(1i32));
        assert_eq!(*ipv6["token"], Value::from("::1:2"));

        let private: Ipv6Addr = "fd00::53".parse().unwrap();
        let expected: Vec<Vec<u8>> = vec![private.octets().to_vec()];
        assert_eq!(*ipv6["dns"], Value::from(expected));
    }

    #[test]
    fn ipv4_dns_uses_network_byte_order() {
        let plan = plan_patch("802-11-wireless", "Airport", &policy()).unwrap();
        let ipv4 = plan.ipv4_group().unwrap();

        let expected: Vec<u32> = vec![
            u32::from_ne_bytes([1, 1, 1, 1]),
            u32::from_ne_bytes([9, 9, 9, 9]),
        ];
        assert_eq!(*ipv4["dns"], Value::from(expected));
        assert_eq!(*ipv4["dns-priority"], Value::from(2i32));
    }

    #[test]
    fn apply_replaces_only_ip_groups() {
        let original = wireless_profile("Home", "Home", Some(1));
        let mut settings = original.clone();
        let plan = plan_patch("802-11-wireless", "Home", &policy()).unwrap();
        plan.apply(&mut settings).unwrap();

        assert_eq!(settings["connection"], original["connection"]);
        assert_eq!(settings["802-11-wireless"], original["802-11-wireless"]);
        assert!(settings.contains_key("ipv4"));
        assert!(settings.contains_key("ipv6"));
    }
}
