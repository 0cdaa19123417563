use std::ffi::{CStr, CString};
use std::fs;
use std::io;
use std::net::Ipv4Addr;

use crate::addr::{Ipv4Address, MacAddress};
use crate::error::{Error, Result};

fn interface_error(name: &str, reason: impl ToString) -> Error {
    Error::Interface { name: name.to_string(), reason: reason.to_string() }
}

pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

pub fn if_nametoindex(name: &str) -> Result<u32> {
    let name_cstr = CString::new(name).map_err(|_| interface_error(name, "invalid interface name"))?;
    let idx = unsafe { libc::if_nametoindex(name_cstr.as_ptr()) };
    if idx == 0 {
        return Err(interface_error(name, io::Error::last_os_error()));
    }
    Ok(idx)
}

/// Hardware address of `name` as reported by sysfs.
pub fn mac_address(name: &str) -> Result<MacAddress> {
    let path = format!("/sys/class/net/{}/address", name);
    let text = fs::read_to_string(&path)
        .map_err(|e| interface_error(name, format!("could not read MAC address from {}: {}", path, e)))?;
    Ok(text.trim().parse()?)
}

/// First IPv4 address assigned to `name`.
pub fn ipv4_address(name: &str) -> Result<Ipv4Address> {
    let mut addrs: *mut libc::ifaddrs = std::ptr::null_mut();
    if unsafe { libc::getifaddrs(&mut addrs) } != 0 {
        return Err(interface_error(name, io::Error::last_os_error()));
    }

    let mut found = None;
    let mut cursor = addrs;
    while !cursor.is_null() {
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;

        if entry.ifa_addr.is_null() || entry.ifa_name.is_null() {
            continue;
        }
        let entry_name = unsafe { CStr::from_ptr(entry.ifa_name) };
        if entry_name.to_bytes() != name.as_bytes() {
            continue;
        }
        let family = unsafe { (*entry.ifa_addr).sa_family };
        if family as libc::c_int != libc::AF_INET {
            continue;
        }

        let sin = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in) };
        found = Some(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)));
        break;
    }
    unsafe { libc::freeifaddrs(addrs) };

    found
        .map(Ipv4Address::from)
        .ok_or_else(|| interface_error(name, "no IPv4 address assigned"))
}
