/* STATIC Proxy (AGPL-3.0)

Copyright (C) 2025 - 404 Contributors

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU Affero General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU Affero General Public License for more details.

You should have received a copy of the GNU Affero General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.

*/

//! HTML response injector for interception proxies.
//!
//! The host proxy engine hands over each buffered response as a [`proxy::Flow`]; the
//! [`inject::Interceptor`] decides whether the body is an HTML document, splices the
//! configured payload in front of the first `</body>`, and records the original and
//! modified bodies under a shared sequence number.

pub mod app;
pub mod assets;
pub mod config;
pub mod inject;
pub mod proxy;
pub mod telemetry;
pub mod utils;
