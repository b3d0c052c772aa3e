// ABOUTME: Build method resolution: find or generate a Dockerfile at the source root.
// ABOUTME: Case-insensitive detection, framework templates, auto-detection from package.json.

use crate::records::BuildMethod;
use std::fs;
use std::path::Path;

pub const CONTAINER_PORT: u16 = 80;

/// How the working directory will be turned into an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedMethod {
    /// A Dockerfile was already present (possibly renamed to canonical casing).
    ExistingDockerfile,
    /// A framework template Dockerfile was generated.
    Template(&'static str),
}

impl ResolvedMethod {
    pub fn describe(&self) -> String {
        match self {
            ResolvedMethod::ExistingDockerfile => "repository Dockerfile".to_string(),
            ResolvedMethod::Template(name) => format!("{} template", name),
        }
    }
}

/// Errors from build method resolution.
#[derive(Debug, thiserror::Error)]
pub enum MethodError {
    #[error("no Dockerfile found in repository root")]
    MissingDockerfile,

    #[error("unknown framework template: {0}")]
    UnknownTemplate(String),

    #[error("failed to prepare Dockerfile: {0}")]
    Io(#[from] std::io::Error),
}

impl MethodError {
    /// Remediation text written into the deployment transcript.
    pub fn remediation(&self) -> Option<String> {
        match self {
            MethodError::MissingDockerfile => Some(
                "To fix this, either:\n\
                 1. add a Dockerfile to the repository root\n\
                 2. set the build method to 'auto' to detect a framework\n\
                 3. choose a framework template: nextjs, node, static"
                    .to_string(),
            ),
            MethodError::UnknownTemplate(_) => {
                Some("Known templates are: nextjs, node, static".to_string())
            }
            MethodError::Io(_) => None,
        }
    }
}

/// Ensure a buildable `Dockerfile` exists at the root of `workdir`.
///
/// An existing Dockerfile under any letter-casing wins regardless of the
/// declared method and is renamed to the canonical name. Otherwise `auto`
/// detects a framework from package.json and a declared template is written
/// as-is. Method `dockerfile` with no Dockerfile present is an error.
pub fn resolve(workdir: &Path, method: &BuildMethod) -> Result<ResolvedMethod, MethodError> {
    if find_and_canonicalize_dockerfile(workdir)? {
        return Ok(ResolvedMethod::ExistingDockerfile);
    }

    let template = match method {
        BuildMethod::Dockerfile => return Err(MethodError::MissingDockerfile),
        BuildMethod::Auto => detect_framework(workdir),
        BuildMethod::Framework(name) => match name.as_str() {
            "nextjs" | "next" => "nextjs",
            "node" | "nodejs" => "node",
            "static" => "static",
            other => return Err(MethodError::UnknownTemplate(other.to_string())),
        },
    };

    let content = template_content(template);
    fs::write(workdir.join("Dockerfile"), content)?;
    Ok(ResolvedMethod::Template(template))
}

/// Look for a Dockerfile under any casing. When found under a non-canonical
/// name, rename it so the engine build finds it.
fn find_and_canonicalize_dockerfile(workdir: &Path) -> Result<bool, MethodError> {
    for entry in fs::read_dir(workdir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        if name.eq_ignore_ascii_case("Dockerfile") {
            if name != "Dockerfile" {
                fs::rename(entry.path(), workdir.join("Dockerfile"))?;
            }
            return Ok(true);
        }
    }
    Ok(false)
}

/// Pick a template from what the repository looks like. A package.json with
/// a `next` dependency means Next.js, any package.json means Node, anything
/// else is served as static files.
fn detect_framework(workdir: &Path) -> &'static str {
    let package_json = workdir.join("package.json");
    let Ok(raw) = fs::read_to_string(&package_json) else {
        return "static";
    };

    let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&raw) else {
        return "node";
    };

    let has_next = ["dependencies", "devDependencies"].iter().any(|section| {
        parsed
            .get(section)
            .and_then(|deps| deps.get("next"))
            .is_some()
    });

    if has_next { "nextjs" } else { "node" }
}

fn template_content(template: &str) -> &'static str {
    match template {
        "nextjs" => NEXTJS_TEMPLATE,
        "node" => NODE_TEMPLATE,
        _ => STATIC_TEMPLATE,
    }
}

const NEXTJS_TEMPLATE: &str = r#"FROM node:20-alpine AS deps
WORKDIR /app
COPY package.json package-lock.json* ./
RUN npm install

FROM node:20-alpine AS build
WORKDIR /app
COPY --from=deps /app/node_modules ./node_modules
COPY . .
RUN npm run build

FROM node:20-alpine AS runner
WORKDIR /app
ENV NODE_ENV=production
ENV PORT=80
COPY --from=build /app/package.json ./package.json
COPY --from=build /app/node_modules ./node_modules
COPY --from=build /app/.next ./.next
COPY --from=build /app/public ./public
RUN npm prune --omit=dev
EXPOSE 80
CMD ["npx", "next", "start", "-p", "80"]
"#;

const NODE_TEMPLATE: &str = r#"FROM node:20-alpine AS build
WORKDIR /app
COPY package.json package-lock.json* ./
RUN npm install
COPY . .
RUN npm run build --if-present

FROM node:20-alpine
WORKDIR /app
ENV NODE_ENV=production
ENV PORT=80
COPY --from=build /app ./
RUN npm prune --omit=dev
EXPOSE 80
CMD ["npm", "start"]
"#;

const STATIC_TEMPLATE: &str = r#"FROM nginx:alpine
COPY . /usr/share/nginx/html
EXPOSE 80
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn existing_dockerfile_is_used() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();

        let resolved = resolve(dir.path(), &BuildMethod::Auto).unwrap();
        assert_eq!(resolved, ResolvedMethod::ExistingDockerfile);
        assert_eq!(
            fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
            "FROM alpine\n"
        );
    }

    #[test]
    fn lowercase_dockerfile_is_renamed_to_canonical() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("dockerfile"), "FROM alpine\n").unwrap();

        let resolved = resolve(dir.path(), &BuildMethod::Dockerfile).unwrap();
        assert_eq!(resolved, ResolvedMethod::ExistingDockerfile);
        assert!(dir.path().join("Dockerfile").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
            "FROM alpine\n"
        );
    }

    #[test]
    fn dockerfile_method_without_dockerfile_fails_with_remediation() {
        let dir = tempdir().unwrap();

        let err = resolve(dir.path(), &BuildMethod::Dockerfile).unwrap_err();
        assert!(matches!(err, MethodError::MissingDockerfile));
        let remediation = err.remediation().unwrap();
        assert!(remediation.contains("add a Dockerfile"));
        assert!(remediation.contains("auto"));
        assert!(remediation.contains("nextjs, node, static"));
    }

    #[test]
    fn auto_detects_nextjs_from_package_json() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"next": "^14.0.0", "react": "^18.0.0"}}"#,
        )
        .unwrap();

        let resolved = resolve(dir.path(), &BuildMethod::Auto).unwrap();
        assert_eq!(resolved, ResolvedMethod::Template("nextjs"));
        let written = fs::read_to_string(dir.path().join("Dockerfile")).unwrap();
        assert!(written.contains("next start"));
        assert!(written.contains("EXPOSE 80"));
    }

    #[test]
    fn auto_without_package_json_falls_back_to_static() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let resolved = resolve(dir.path(), &BuildMethod::Auto).unwrap();
        assert_eq!(resolved, ResolvedMethod::Template("static"));
        assert!(
            fs::read_to_string(dir.path().join("Dockerfile"))
                .unwrap()
                .contains("nginx")
        );
    }

    #[test]
    fn declared_template_is_written_without_detection() {
        let dir = tempdir().unwrap();

        let resolved =
            resolve(dir.path(), &BuildMethod::Framework("node".to_string())).unwrap();
        assert_eq!(resolved, ResolvedMethod::Template("node"));
        assert!(dir.path().join("Dockerfile").exists());
    }

    #[test]
    fn unknown_template_name_is_rejected() {
        let dir = tempdir().unwrap();

        let err = resolve(dir.path(), &BuildMethod::Framework("rails".to_string())).unwrap_err();
        assert!(matches!(err, MethodError::UnknownTemplate(_)));
    }
}
