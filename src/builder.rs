//! Packages a Jupyter notebook into a runnable image.
//!
//! The notebook is staged next to a generated `Dockerfile` and `startup.sh` in a
//! temporary directory, which the image runtime then builds.

use crate::runtime::ImageRuntime;
use crate::validation::{validate_image_name, validate_notebook_source, NotebookSource};
use anyhow::{Context, Result};
use futures::StreamExt;
use std::path::Path;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::info;

pub const NOTEBOOK_FILE: &str = "source.ipynb";

const STARTUP_SCRIPT: &str = r#"#!/bin/bash
jupyter nbconvert --to notebook --execute /usr/src/app/source.ipynb --output /usr/src/app/executed_notebook.ipynb | tee /usr/src/app/notebook_log.txt
exec start-notebook.sh --NotebookApp.token='' --NotebookApp.password=''
"#;

const DOCKERFILE: &str = r#"FROM jupyter/base-notebook

USER root
RUN apt-get update && apt-get install -y ffmpeg

COPY source.ipynb startup.sh /usr/src/app/
RUN chmod +x /usr/src/app/startup.sh
RUN chown -R jovyan:users /usr/src/app

USER jovyan
WORKDIR /usr/src/app

RUN pip install nbconvert dawnet-client

EXPOSE 8888
CMD ["bash", "/usr/src/app/startup.sh"]
"#;

/// A populated build context. The directory is removed on drop.
pub struct StagedContext {
    dir: TempDir,
}

impl StagedContext {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Build the staged context as `tag`, forwarding each output line.
    pub fn build(
        &self,
        runtime: &dyn ImageRuntime,
        tag: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<()> {
        validate_image_name(tag)?;
        runtime
            .build(self.path(), tag, on_line)
            .with_context(|| format!("build image {tag}"))?;
        info!(tag, "image built");
        Ok(())
    }
}

/// Fetch or copy the notebook and write the build files around it.
pub async fn stage(http: &reqwest::Client, source: &str) -> Result<StagedContext> {
    let source = validate_notebook_source(source)?;
    let dir = tempfile::Builder::new()
        .prefix("runes-build-")
        .tempdir()
        .context("create build directory")?;
    let notebook = dir.path().join(NOTEBOOK_FILE);

    match &source {
        NotebookSource::Url(url) => download(http, url.as_str(), &notebook).await?,
        NotebookSource::File(path) => {
            tokio::fs::copy(path, &notebook)
                .await
                .with_context(|| format!("copy {}", path.display()))?;
        }
    }

    tokio::fs::write(dir.path().join("startup.sh"), STARTUP_SCRIPT)
        .await
        .context("write startup.sh")?;
    tokio::fs::write(dir.path().join("Dockerfile"), DOCKERFILE)
        .await
        .context("write Dockerfile")?;

    info!(dir = %dir.path().display(), "staged build context");
    Ok(StagedContext { dir })
}

async fn download(http: &reqwest::Client, url: &str, dest: &Path) -> Result<()> {
    let res = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("download {url}"))?;

    let mut file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("create {}", dest.display()))?;
    let mut stream = res.bytes_stream();
    let mut total = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("read body of {url}"))?;
        total += chunk.len();
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    info!(url, bytes = total, "downloaded notebook");
    Ok(())
}
