//! Operator-facing dumps of limiter state.
//!
//! Each dump takes the counter's mutex for the duration of the walk, so the
//! output is a consistent point-in-time snapshot. Dumping never mutates
//! state. The formats are for humans and are not stable interfaces.

use std::fmt::Write;
use std::net::IpAddr;
use std::time::Duration;

use crate::ratelimit::counter::{now_nanos, Counter, Nanos};
use crate::ratelimit::key::{key_to_ipv4, key_to_ipv6};
use crate::ratelimit::limiter::IpLimiter;

/// Elapsed time between a stored timestamp and `now`, floored at zero.
fn since(now: Nanos, then: Nanos) -> Duration {
    Duration::from_nanos((now - then).max(0) as u64)
}

/// Render with millisecond granularity; sub-ms noise is not useful here.
fn fmt_rounded(d: Duration) -> String {
    let ms = (d.as_nanos() + 500_000) / 1_000_000;
    format!("{:?}", Duration::from_millis(ms as u64))
}

impl Counter {
    pub(super) fn debug_text(&self, key_to_ip: fn(u64) -> IpAddr) -> String {
        let tracked = self.tracked.lock().expect("counter mutex poisoned");
        let now = now_nanos();

        let mut s = String::new();
        let _ = writeln!(s, "Allow: {} / {:?}", self.requests, self.period);
        let _ = writeln!(s, "Size: {} / {}", tracked.entries.len(), self.capacity);
        s.push('\n');
        for (key, e) in tracked.iter_lru() {
            let _ = writeln!(
                s,
                "{:<22} {:>3} requests left, last allowed {:>10} ago",
                key_to_ip(key).to_string(),
                e.requests_left,
                fmt_rounded(since(now, e.last_allowed)),
            );
        }
        s
    }

    pub(super) fn debug_html(&self, key_to_ip: fn(u64) -> IpAddr) -> String {
        let tracked = self.tracked.lock().expect("counter mutex poisoned");
        let now = now_nanos();

        let mut s = String::new();
        let _ = writeln!(s, "Allow: {} / {:?}<br>", self.requests, self.period);
        let _ = writeln!(s, "Size: {} / {}<br>", tracked.entries.len(), self.capacity);
        s.push_str("<p>\n");
        if tracked.entries.is_empty() {
            s.push_str("(empty)<br>");
            return s;
        }

        s.push_str("<table>\n");
        s.push_str("<tr><th>IP</th><th>Requests left</th><th>Last allowed</th></tr>\n");
        for (key, e) in tracked.iter_lru() {
            let _ = writeln!(
                s,
                "<tr><td class=\"ip\">{}</td><td class=\"requests\">{}</td><td class=\"last\">{}</td></tr>",
                key_to_ip(key),
                e.requests_left,
                fmt_rounded(since(now, e.last_allowed)),
            );
        }
        s.push_str("</table>\n");
        s
    }

    /// Tracked key count and capacity, for summary endpoints.
    pub(super) fn occupancy(&self) -> (usize, usize) {
        let tracked = self.tracked.lock().expect("counter mutex poisoned");
        (tracked.entries.len(), self.capacity)
    }
}

impl IpLimiter {
    /// Plain-text dump of all four counters, most recent entries first.
    pub fn debug_text(&self) -> String {
        let mut s = String::from("## IPv4\n\n");
        s += &self.ipv4.debug_text(key_to_ipv4);
        s += "\n\n## IPv6\n\n### /48\n\n";
        s += &self.v48.debug_text(key_to_ipv6);
        s += "\n\n### /56\n\n";
        s += &self.v56.debug_text(key_to_ipv6);
        s += "\n\n### /64\n\n";
        s += &self.v64.debug_text(key_to_ipv6);
        s += "\n";
        s
    }

    /// HTML dump of all four counters: content only, starting at `<h2>`,
    /// meant to be embedded in a page.
    pub fn debug_html(&self) -> String {
        let mut s = String::from("<h2>IPv4</h2>");
        s += &self.ipv4.debug_html(key_to_ipv4);
        s += "<h2>IPv6</h2>";
        s += "<h3>/48</h3>";
        s += &self.v48.debug_html(key_to_ipv6);
        s += "<h3>/56</h3>";
        s += &self.v56.debug_html(key_to_ipv6);
        s += "<h3>/64</h3>";
        s += &self.v64.debug_html(key_to_ipv6);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::time::Duration;

    #[test]
    fn text_dump_lists_tracked_addresses() {
        let l = IpLimiter::new(1, Duration::from_secs(1), 3);
        l.allow("1.1.1.1".parse::<IpAddr>().unwrap());
        l.allow("1111:2222:3333:4444:5555:6666:7777:8888".parse::<IpAddr>().unwrap());

        let s = l.debug_text();
        assert!(s.contains("## IPv4"));
        assert!(s.contains("1.1.1.1"));
        assert!(s.contains("Size: 1 / 3"));
        // The IPv6 entry shows up masked, at each prefix length.
        assert!(s.contains("1111:2222:3333::"));
        assert!(s.contains("1111:2222:3333:4400::"));
        assert!(s.contains("1111:2222:3333:4444::"));
        assert!(s.contains("0 requests left"));
    }

    #[test]
    fn html_dump_renders_tables_and_empty_sections() {
        let l = IpLimiter::new(1, Duration::from_secs(1), 3);
        let s = l.debug_html();
        assert!(s.contains("<h2>IPv4</h2>"));
        assert!(s.contains("(empty)<br>"));

        l.allow("1.1.1.1".parse::<IpAddr>().unwrap());
        let s = l.debug_html();
        assert!(s.contains("<td class=\"ip\">1.1.1.1</td>"));
        assert!(s.contains("<th>Requests left</th>"));
    }

    #[test]
    fn zero_address_is_dumped_as_its_stand_in() {
        let l = IpLimiter::new(1, Duration::from_secs(1), 3);
        l.allow("0.0.0.0".parse::<IpAddr>().unwrap());
        let s = l.debug_text();
        assert!(s.contains("0.0.0.1"));
        assert!(s.contains("Size: 1 / 3"));
    }
}
