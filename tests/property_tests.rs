use std::net::Ipv4Addr;

use proptest::prelude::*;
use zabbix_agent_installer::install::preflight::{is_ipv4, parse_ipv4};

proptest! {
    #[test]
    fn dotted_quads_are_accepted(a: u8, b: u8, c: u8, d: u8) {
        let s = format!("{a}.{b}.{c}.{d}");
        prop_assert!(is_ipv4(&s));
        prop_assert_eq!(parse_ipv4(&s), Some(Ipv4Addr::new(a, b, c, d)));
    }

    #[test]
    fn out_of_range_octet_is_rejected(a: u8, b: u8, c: u8, big in 256u32..100_000) {
        let s = format!("{a}.{b}.{c}.{big}");
        prop_assert!(!is_ipv4(&s));
    }

    #[test]
    fn accepted_strings_have_four_octets(s in "[0-9.]{1,20}") {
        if is_ipv4(&s) {
            let octets: Vec<&str> = s.split('.').collect();
            prop_assert_eq!(octets.len(), 4);
            for octet in octets {
                prop_assert!(octet.parse::<u8>().is_ok());
            }
        }
    }
}
