//! Route table and path resolution.
//!
//! DESIGN
//! ======
//! Patterns are `/`-separated segments; a segment starting with `:` captures
//! a parameter. Query strings use form encoding: values are decoded on
//! resolve and re-encoded by [`ResolvedRoute::full_path`]. Views are opaque to routing and only carried through to the
//! caller. The guard reads [`RouteMeta`]; nothing in routing writes it.

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

use std::collections::BTreeMap;

use reqwest::Url;
use serde::Serialize;

pub const HOME_ROUTE: &str = "Home";
pub const LOGIN_ROUTE: &str = "Login";

/// Throwaway origin used to run query strings through the URL parser.
const QUERY_BASE: &str = "http://localhost/";

/// Page a route renders. Rendering itself lives outside this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum View {
    Home,
    Map,
    PlantDetail,
    Encyclopedia,
    Search,
    UserProfile,
    MyEncyclopedia,
    PlantEditor,
    MyComments,
    Login,
    Register,
    AdminDashboard,
}

/// Flags the navigation guard reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RouteMeta {
    pub title: Option<String>,
    pub requires_auth: bool,
    pub requires_admin: bool,
    /// Page intended for signed-out visitors (registration).
    pub guest: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: Option<String>,
    pub view: Option<View>,
    /// Static redirect applied before any guard runs.
    pub redirect: Option<String>,
    pub meta: RouteMeta,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>, name: impl Into<String>, view: View) -> Self {
        Self { path: path.into(), name: Some(name.into()), view: Some(view), redirect: None, meta: RouteMeta::default() }
    }

    pub fn redirect(path: impl Into<String>, to: impl Into<String>) -> Self {
        Self { path: path.into(), name: None, view: None, redirect: Some(to.into()), meta: RouteMeta::default() }
    }

    #[must_use]
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.meta.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn requires_auth(mut self) -> Self {
        self.meta.requires_auth = true;
        self
    }

    #[must_use]
    pub fn requires_admin(mut self) -> Self {
        self.meta.requires_admin = true;
        self
    }

    #[must_use]
    pub fn guest(mut self) -> Self {
        self.meta.guest = true;
        self
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        split_path(&self.path)
    }

    fn match_path(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut wanted = self.segments();
        let mut given = split_path(path);
        loop {
            match (wanted.next(), given.next()) {
                (None, None) => return Some(params),
                (Some(pattern), Some(segment)) => {
                    if let Some(key) = pattern.strip_prefix(':') {
                        params.insert(key.to_owned(), segment.to_owned());
                    } else if pattern != segment {
                        return None;
                    }
                }
                _ => return None,
            }
        }
    }

    fn build_path(&self, params: &BTreeMap<String, String>) -> Option<String> {
        let mut out = String::new();
        for segment in self.segments() {
            out.push('/');
            match segment.strip_prefix(':') {
                Some(key) => out.push_str(params.get(key)?),
                None => out.push_str(segment),
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        Some(out)
    }
}

/// A location matched against the table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedRoute {
    /// Normalized path without query string.
    pub path: String,
    pub name: Option<String>,
    pub view: Option<View>,
    pub redirect: Option<String>,
    pub params: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub meta: RouteMeta,
}

impl ResolvedRoute {
    /// Path plus query string, as it would appear in the address bar.
    #[must_use]
    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let Ok(mut url) = Url::parse(QUERY_BASE) else {
            return self.path.clone();
        };
        url.query_pairs_mut().extend_pairs(&self.query);
        format!("{}?{}", self.path, url.query().unwrap_or_default())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self { routes }
    }

    /// The campus plant guide's pages.
    #[must_use]
    pub fn campus_guide() -> Self {
        Self::new(vec![
            RouteDescriptor::redirect("/", "/home").titled("Welcome"),
            RouteDescriptor::new("/home", HOME_ROUTE, View::Home).titled("Welcome"),
            RouteDescriptor::new("/map", "Map", View::Map).titled("Map Tour"),
            RouteDescriptor::new("/plant/:id", "PlantDetail", View::PlantDetail).titled("Plant Details"),
            RouteDescriptor::new("/encyclopedia", "Encyclopedia", View::Encyclopedia).titled("Plant Encyclopedia"),
            RouteDescriptor::new("/search", "Search", View::Search).titled("Search Plants"),
            RouteDescriptor::new("/profile", "UserProfile", View::UserProfile)
                .titled("My Profile")
                .requires_auth(),
            RouteDescriptor::new("/my-encyclopedia", "MyEncyclopedia", View::MyEncyclopedia)
                .titled("My Encyclopedia")
                .requires_auth(),
            RouteDescriptor::new("/my-encyclopedia/new", "PlantCreate", View::PlantEditor).requires_auth(),
            RouteDescriptor::new("/my-encyclopedia/edit/:id", "PlantEdit", View::PlantEditor).requires_auth(),
            RouteDescriptor::new("/my-comments", "MyComments", View::MyComments)
                .titled("My Comments")
                .requires_auth(),
            RouteDescriptor::new("/login", LOGIN_ROUTE, View::Login).titled("Log In"),
            RouteDescriptor::new("/register", "register", View::Register).guest(),
            RouteDescriptor::new("/admin", "AdminDashboard", View::AdminDashboard)
                .titled("Admin Console")
                .requires_auth()
                .requires_admin(),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }

    /// Match `location` (path with optional `?query`). First match wins.
    #[must_use]
    pub fn resolve(&self, location: &str) -> Option<ResolvedRoute> {
        let (path, query) = split_location(location);
        self.routes.iter().find_map(|route| {
            let params = route.match_path(path)?;
            Some(resolved(route, normalize_path(path), params, parse_query(query)))
        })
    }

    /// Build the location for the route called `name`; `None` if unknown or a
    /// parameter is missing.
    #[must_use]
    pub fn resolve_named(&self, name: &str, params: &BTreeMap<String, String>) -> Option<ResolvedRoute> {
        let route = self.routes.iter().find(|r| r.name.as_deref() == Some(name))?;
        let path = route.build_path(params)?;
        let params = route.match_path(&path)?;
        Some(resolved(route, path, params, BTreeMap::new()))
    }
}

fn resolved(
    route: &RouteDescriptor,
    path: String,
    params: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
) -> ResolvedRoute {
    ResolvedRoute {
        path,
        name: route.name.clone(),
        view: route.view,
        redirect: route.redirect.clone(),
        params,
        query,
        meta: route.meta.clone(),
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn normalize_path(path: &str) -> String {
    let joined: Vec<&str> = split_path(path).collect();
    format!("/{}", joined.join("/"))
}

fn split_location(location: &str) -> (&str, &str) {
    let location = location.split('#').next().unwrap_or_default();
    location.split_once('?').unwrap_or((location, ""))
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    if query.is_empty() {
        return BTreeMap::new();
    }
    let Ok(url) = Url::parse(&format!("{QUERY_BASE}?{query}")) else {
        return BTreeMap::new();
    };
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
