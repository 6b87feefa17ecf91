//! Interface enumeration via `getifaddrs(3)`.

use std::net::IpAddr;

/// One address of one local interface.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub addr: IpAddr,
}

/// Snapshot of every interface address the OS reports. Interfaces without
/// an address entry (or with a non-IP family) are skipped.
#[cfg(unix)]
pub fn interfaces() -> Vec<Interface> {
    use std::ffi::CStr;
    use std::net::{Ipv4Addr, Ipv6Addr};

    let mut out = Vec::new();

    unsafe {
        let mut ifap: *mut libc::ifaddrs = std::ptr::null_mut();
        if libc::getifaddrs(&mut ifap) != 0 {
            return out;
        }

        let mut cursor = ifap;
        while !cursor.is_null() {
            let entry = &*cursor;
            cursor = entry.ifa_next;

            if entry.ifa_addr.is_null() {
                continue;
            }

            let name = CStr::from_ptr(entry.ifa_name).to_string_lossy().into_owned();

            let addr = match i32::from((*entry.ifa_addr).sa_family) {
                libc::AF_INET => {
                    let sin = &*(entry.ifa_addr as *const libc::sockaddr_in);
                    IpAddr::V4(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)))
                }
                libc::AF_INET6 => {
                    let sin6 = &*(entry.ifa_addr as *const libc::sockaddr_in6);
                    IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr))
                }
                _ => continue,
            };

            out.push(Interface { name, addr });
        }

        libc::freeifaddrs(ifap);
    }

    out
}

#[cfg(not(unix))]
pub fn interfaces() -> Vec<Interface> {
    Vec::new()
}
